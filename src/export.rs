//! GeoJSON and KML export of stored history.

use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Value, json};
use tracing::info;

use crate::error::TrackerError;
use crate::rest::MovementStatus;
use crate::sink::HistoryRecord;

/// Build a `FeatureCollection` from history records given newest first.
///
/// Points come out in chronological order, followed by a `LineString`
/// "Vehicle Path" once there are at least two points.
pub fn geojson(history: &[HistoryRecord]) -> Value {
    let mut features: Vec<Value> = Vec::with_capacity(history.len() + 1);
    let mut coordinates: Vec<Value> = Vec::with_capacity(history.len());

    for record in history.iter().rev() {
        let point = json!([record.reading.longitude, record.reading.latitude]);
        features.push(json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": point.clone() },
            "properties": {
                "speed": record.reading.speed,
                "status": record.reading.status.as_str(),
                "timestamp": record.recorded_at,
            }
        }));
        coordinates.push(point);
    }

    if coordinates.len() > 1 {
        let points = coordinates.len();
        features.push(json!({
            "type": "Feature",
            "geometry": { "type": "LineString", "coordinates": coordinates },
            "properties": { "name": "Vehicle Path", "points": points }
        }));
    }

    json!({ "type": "FeatureCollection", "features": features })
}

/// Write the GeoJSON export of `history` to `path`.
pub fn write_geojson(path: &Path, history: &[HistoryRecord]) -> Result<(), TrackerError> {
    ensure_history(history)?;
    let contents = serde_json::to_string_pretty(&geojson(history))?;
    write_export(path, history.len(), contents.as_bytes())
}

/// KML colors are `aabbggrr`.
const KML_GREEN: &str = "ff00ff00";
const KML_RED: &str = "ff0000ff";
const KML_BLUE: &str = "ffff0000";
const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Build a KML document from history records given newest first.
///
/// A "Location Points" folder holds one placemark per record in
/// chronological order, green while moving and red otherwise. A blue
/// "Vehicle Path" line follows once there are at least two points.
pub fn kml(history: &[HistoryRecord]) -> Result<String, TrackerError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut coordinates = Vec::with_capacity(history.len());

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("kml").with_attributes([("xmlns", KML_NAMESPACE)])),
    )?;
    start(&mut writer, "Document")?;
    text_element(&mut writer, "name", "Vehicle Tracking History")?;

    start(&mut writer, "Folder")?;
    text_element(&mut writer, "name", "Location Points")?;
    for record in history.iter().rev() {
        let reading = &record.reading;
        let point = format!("{},{}", reading.longitude, reading.latitude);
        let color = if reading.status == MovementStatus::Moving {
            KML_GREEN
        } else {
            KML_RED
        };

        start(&mut writer, "Placemark")?;
        text_element(
            &mut writer,
            "name",
            &format!("{} - {} km/h", reading.status, reading.speed),
        )?;
        text_element(
            &mut writer,
            "description",
            &format!(
                "Time: {}\nSpeed: {} km/h\nStatus: {}",
                record.recorded_at, reading.speed, reading.status
            ),
        )?;
        start(&mut writer, "Style")?;
        start(&mut writer, "IconStyle")?;
        text_element(&mut writer, "color", color)?;
        end(&mut writer, "IconStyle")?;
        end(&mut writer, "Style")?;
        start(&mut writer, "Point")?;
        text_element(&mut writer, "coordinates", &point)?;
        end(&mut writer, "Point")?;
        end(&mut writer, "Placemark")?;

        coordinates.push(point);
    }
    end(&mut writer, "Folder")?;

    if coordinates.len() > 1 {
        start(&mut writer, "Placemark")?;
        text_element(&mut writer, "name", "Vehicle Path")?;
        start(&mut writer, "Style")?;
        start(&mut writer, "LineStyle")?;
        text_element(&mut writer, "color", KML_BLUE)?;
        text_element(&mut writer, "width", "3")?;
        end(&mut writer, "LineStyle")?;
        end(&mut writer, "Style")?;
        start(&mut writer, "LineString")?;
        text_element(&mut writer, "coordinates", &coordinates.join(" "))?;
        end(&mut writer, "LineString")?;
        end(&mut writer, "Placemark")?;
    }

    end(&mut writer, "Document")?;
    end(&mut writer, "kml")?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| TrackerError::StorageUnavailable(format!("KML is not UTF-8: {e}")))
}

/// Write the KML export of `history` to `path`.
pub fn write_kml(path: &Path, history: &[HistoryRecord]) -> Result<(), TrackerError> {
    ensure_history(history)?;
    let contents = kml(history)?;
    write_export(path, history.len(), contents.as_bytes())
}

fn ensure_history(history: &[HistoryRecord]) -> Result<(), TrackerError> {
    if history.is_empty() {
        return Err(TrackerError::StorageUnavailable(
            "No historical data to export".to_string(),
        ));
    }
    Ok(())
}

fn write_export(path: &Path, points: usize, contents: &[u8]) -> Result<(), TrackerError> {
    std::fs::write(path, contents)
        .map_err(|e| TrackerError::StorageUnavailable(format!("{}: {e}", path.display())))?;
    info!(points, path = %path.display(), "Exported history");
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), TrackerError> {
    writer
        .write_event(event)
        .map_err(|e| TrackerError::StorageUnavailable(format!("KML: {e}")))
}

fn start(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), TrackerError> {
    emit(writer, Event::Start(BytesStart::new(name)))
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), TrackerError> {
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), TrackerError> {
    start(writer, name)?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    end(writer, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::sample_reading;

    fn record(lng: f64, lat: f64, at: &str) -> HistoryRecord {
        HistoryRecord {
            reading: sample_reading(lng, lat),
            recorded_at: at.to_string(),
        }
    }

    #[test]
    fn test_points_are_chronological_with_path() {
        let history = vec![
            record(4.5, 52.3, "2024-05-01T08:02:00Z"),
            record(4.4, 52.2, "2024-05-01T08:01:00Z"),
            record(4.3, 52.1, "2024-05-01T08:00:00Z"),
        ];
        let collection = geojson(&history);
        let features = collection["features"].as_array().unwrap();

        assert_eq!(collection["type"], "FeatureCollection");
        assert_eq!(features.len(), 4);
        assert_eq!(features[0]["properties"]["timestamp"], "2024-05-01T08:00:00Z");
        assert_eq!(features[0]["geometry"]["coordinates"], json!([4.3, 52.1]));
        assert_eq!(features[3]["geometry"]["type"], "LineString");
        assert_eq!(features[3]["properties"]["points"], 3);
        assert_eq!(
            features[3]["geometry"]["coordinates"],
            json!([[4.3, 52.1], [4.4, 52.2], [4.5, 52.3]])
        );
    }

    #[test]
    fn test_single_point_has_no_path() {
        let collection = geojson(&[record(4.3, 52.1, "2024-05-01T08:00:00Z")]);
        assert_eq!(collection["features"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_history_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("path.geojson");
        assert!(write_geojson(&path, &[]).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_geojson_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("path.geojson");
        write_geojson(&path, &[record(4.3, 52.1, "t1"), record(4.2, 52.0, "t0")]).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["features"].as_array().unwrap().len(), 3);
    }

    fn moving(lng: f64, lat: f64, at: &str) -> HistoryRecord {
        let mut record = record(lng, lat, at);
        record.reading.status = MovementStatus::Moving;
        record.reading.speed = 42.5;
        record
    }

    fn parked(lng: f64, lat: f64, at: &str) -> HistoryRecord {
        let mut record = record(lng, lat, at);
        record.reading.status = MovementStatus::AtRest;
        record.reading.speed = 0.0;
        record
    }

    #[test]
    fn test_kml_points_are_chronological_with_path() {
        let history = vec![
            moving(4.5, 52.3, "2024-05-01T08:02:00Z"),
            parked(4.3, 52.1, "2024-05-01T08:00:00Z"),
        ];
        let document = kml(&history).unwrap();

        assert!(document.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(document.contains("<name>Location Points</name>"));
        assert!(document.contains("<name>MOVING - 42.5 km/h</name>"));
        assert!(document.contains("<coordinates>4.3,52.1 4.5,52.3</coordinates>"));
        assert!(document.contains("<name>Vehicle Path</name>"));
        assert!(document.contains(&format!("<color>{KML_BLUE}</color>")));

        let first = document.find("<coordinates>4.3,52.1</coordinates>").unwrap();
        let second = document.find("<coordinates>4.5,52.3</coordinates>").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_kml_pin_color_follows_status() {
        let at_rest = kml(&[parked(4.3, 52.1, "t0")]).unwrap();
        assert!(at_rest.contains(&format!("<color>{KML_RED}</color>")));
        assert!(!at_rest.contains("Vehicle Path"));

        let driving = kml(&[moving(4.3, 52.1, "t0")]).unwrap();
        assert!(driving.contains(&format!("<color>{KML_GREEN}</color>")));
    }

    #[test]
    fn test_kml_escapes_text() {
        let mut odd = record(4.3, 52.1, "t0");
        odd.reading.status = MovementStatus::Other("TOWED<&>".to_string());
        let document = kml(&[odd]).unwrap();
        assert!(document.contains("TOWED&lt;&amp;&gt; - "));
    }

    #[test]
    fn test_write_kml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("path.kml");
        assert!(write_kml(&path, &[]).is_err());
        assert!(!path.exists());

        write_kml(&path, &[record(4.3, 52.1, "t1"), record(4.2, 52.0, "t0")]).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("<Placemark>").count(), 3);
    }
}
