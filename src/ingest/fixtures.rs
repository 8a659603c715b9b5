/// Test fixtures: representative JSON payloads from the provider APIs.
///
/// Structurally complete but truncated to the minimum needed to exercise
/// the parsers.
///
/// IMGW bulk payload shape (one array element per station):
///   - every value is a JSON string, including numbers and timestamps
///   - decimal separator may be `.` or `,`
///   - a metric the station does not measure arrives as null or ""
///   - hydro/meteo records repeat station metadata (name, lat/lon) on
///     every poll
///
/// Open-Meteo forecast shape:
///   - `hourly`/`daily` blocks hold arrays aligned by index with their
///     `time` array; entries may be null
///   - `current` block holds scalars for one observation instant

/// Two synop stations; the first uses a comma decimal for pressure and an
/// empty wind direction.
#[cfg(test)]
pub(crate) fn fixture_synop_json() -> &'static str {
    r#"[
      {
        "id_stacji": "12295",
        "stacja": "Białystok",
        "data_pomiaru": "2025-01-01",
        "godzina_pomiaru": "10",
        "temperatura": "4,7",
        "predkosc_wiatru": "3",
        "kierunek_wiatru": "",
        "wilgotnosc_wzgledna": "87,5",
        "suma_opadu": "0",
        "cisnienie": "1012,3"
      },
      {
        "id_stacji": "12500",
        "stacja": "Jelenia Góra",
        "data_pomiaru": "2025-01-01",
        "godzina_pomiaru": "10",
        "temperatura": "2.1",
        "predkosc_wiatru": "1",
        "kierunek_wiatru": "250",
        "wilgotnosc_wzgledna": "93.0",
        "suma_opadu": "0.2",
        "cisnienie": "1009.8"
      }
    ]"#
}

/// One hydro station on a small river: water level and temperature are
/// measured, discharge is not (null value and null timestamp).
#[cfg(test)]
pub(crate) fn fixture_hydro_json() -> &'static str {
    r#"[
      {
        "id_stacji": "151140030",
        "stacja": "Przewoźniki",
        "rzeka": "Skroda",
        "wojewodztwo": "lubuskie",
        "lat": "51.517222",
        "lon": "14.737222",
        "stan_wody": "182",
        "stan_wody_data_pomiaru": "2025-01-01 10:10:00",
        "temperatura_wody": "3,2",
        "temperatura_wody_data_pomiaru": "2025-01-01 10:10:00",
        "przelyw": null,
        "przeplyw_data": null,
        "zjawisko_lodowe": "0",
        "zjawisko_lodowe_data_pomiaru": "2025-01-01 10:10:00",
        "zjawisko_zarastania": "0",
        "zjawisko_zarastania_data_pomiaru": "2025-01-01 10:10:00"
      }
    ]"#
}

/// A hydro record with garbage in numeric fields. The record must still
/// map, with the bad fields as NULL.
#[cfg(test)]
pub(crate) fn fixture_hydro_unparsable_fields_json() -> &'static str {
    r#"[
      {
        "id_stacji": "151140030",
        "stacja": "Przewoźniki",
        "rzeka": "Skroda",
        "wojewodztwo": "lubuskie",
        "lat": "51.517222",
        "lon": "14.737222",
        "stan_wody": "N/A",
        "stan_wody_data_pomiaru": "2025-01-01 10:10:00",
        "temperatura_wody": "brak danych",
        "temperatura_wody_data_pomiaru": "not a timestamp",
        "przelyw": "",
        "przeplyw_data": ""
      }
    ]"#
}

/// One automated meteo station with the full sensor suite, integer wind
/// direction arriving decimal-formatted.
#[cfg(test)]
pub(crate) fn fixture_meteo_json() -> &'static str {
    r#"[
      {
        "kod_stacji": "252200150",
        "nazwa_stacji": "HALA GĄSIENICOWA",
        "lat": "49.243889",
        "lon": "20.007222",
        "temperatura_powietrza": "-2,3",
        "temperatura_powietrza_data": "2025-01-01 10:10:00",
        "temperatura_gruntu": "-1,1",
        "temperatura_gruntu_data": "2025-01-01 10:10:00",
        "wiatr_kierunek": "180.0",
        "wiatr_srednia_predkosc": "5,4",
        "wiatr_predkosc_maksymalna": "9,8",
        "wiatr_srednia_predkosc_data": "2025-01-01 10:10:00",
        "wiatr_poryw_10min": "11,2",
        "wiatr_poryw_10min_data": "2025-01-01 10:10:00",
        "wilgotnosc_wzgledna": "88,0",
        "wilgotnosc_wzgledna_data": "2025-01-01 10:10:00",
        "opad_10min": "0,00",
        "opad_10min_data": "2025-01-01 10:10:00"
      }
    ]"#
}

/// Forecast response with three hourly instants across two calendar days
/// and a null entry in the rain array.
#[cfg(test)]
pub(crate) fn fixture_forecast_json() -> &'static str {
    r#"{
      "latitude": 52.23,
      "longitude": 21.01,
      "timezone": "Europe/Warsaw",
      "hourly": {
        "time": ["2025-01-01T23:00", "2025-01-02T00:00", "2025-01-02T01:00"],
        "temperature_2m": [1.4, 0.9, null],
        "apparent_temperature": [-2.0, -2.6, -3.0],
        "rain": [0.0, null, 0.1],
        "weather_code": [3, 3, 61],
        "cloud_cover": [100, 97, 100],
        "wind_speed_10m": [11.2, 10.4, 12.0],
        "wind_direction_10m": [210, 215, 220],
        "wind_gusts_10m": [24.1, 22.3, 26.0],
        "surface_pressure": [1008.2, 1007.9, 1007.5],
        "uv_index": [0.0, 0.0, 0.0]
      },
      "daily": {
        "time": ["2025-01-01", "2025-01-02"],
        "sunrise": ["2025-01-01T07:45", "2025-01-02T07:45"],
        "sunset": ["2025-01-01T15:32", "2025-01-02T15:33"],
        "uv_index_max": [0.4, 0.5]
      }
    }"#
}

/// Current-conditions response for a virtual station; observation time is
/// mid-hour and must be truncated to the hour for the storage key.
#[cfg(test)]
pub(crate) fn fixture_current_json() -> &'static str {
    r#"{
      "latitude": 53.78,
      "longitude": 20.49,
      "timezone": "Europe/Warsaw",
      "current": {
        "time": "2025-01-01T06:45",
        "temperature_2m": 0.8,
        "apparent_temperature": -3.1,
        "surface_pressure": 1011.4,
        "wind_speed_10m": 14.5,
        "wind_direction_10m": 200,
        "wind_gusts_10m": 31.0,
        "rain": 0.0,
        "relative_humidity_2m": 91.0,
        "weather_code": 3
      }
    }"#
}

/// Forecast response whose daily block is missing entirely — hourly rows
/// must still map, with sun times NULL.
#[cfg(test)]
pub(crate) fn fixture_forecast_no_daily_json() -> &'static str {
    r#"{
      "latitude": 52.23,
      "longitude": 21.01,
      "hourly": {
        "time": ["2025-01-01T23:00"],
        "temperature_2m": [1.4]
      }
    }"#
}
