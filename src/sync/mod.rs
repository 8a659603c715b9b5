/// Fetch orchestration.
///
/// Two run topologies, each a generic engine parameterized by a small
/// per-dataset capability trait:
///
/// - `bulk` — one provider call returns every station's latest readings;
///   the engine resolves stations, applies the merge engine's is-newer
///   predicate, and persists the survivors in a single transaction.
/// - `fanout` — one provider call per station, dispatched batch by batch
///   onto a bounded worker pool with rate-limited spacing and a shared
///   critical flag that aborts dispatch of the remaining batches.
///
/// The dataset implementations live beside their engines: `telemetry`
/// (synop/hydro/meteo over `bulk`) and `forecast`/`current` (over
/// `fanout`).

pub mod bulk;
pub mod current;
pub mod fanout;
pub mod forecast;
pub mod telemetry;
