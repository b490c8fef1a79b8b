//! Destination naming
//!
//! Token expansion for folder and file formats lives behind the
//! `NameBuilder` seam; the default implementation renders a plain
//! `{Title} ({Year})` layout with a ` - pt{n}` suffix for multi-part
//! fighting events.

use arenarr_core::models::event::Event;

/// Builds library folder and file names for an event.
pub trait NameBuilder: Send + Sync {
    fn folder_name(&self, event: &Event) -> String;

    fn file_name(
        &self,
        event: &Event,
        quality: Option<&str>,
        part_name: Option<&str>,
        part_number: Option<i32>,
        extension: &str,
    ) -> String;
}

/// Characters that must not reach the filesystem.
fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain default naming
#[derive(Debug, Default, Clone)]
pub struct DefaultNameBuilder;

impl NameBuilder for DefaultNameBuilder {
    fn folder_name(&self, event: &Event) -> String {
        match event.year() {
            Some(year) => format!("{} ({year})", sanitize(&event.title)),
            None => sanitize(&event.title),
        }
    }

    fn file_name(
        &self,
        event: &Event,
        quality: Option<&str>,
        part_name: Option<&str>,
        part_number: Option<i32>,
        extension: &str,
    ) -> String {
        let mut name = sanitize(&event.title);
        if let Some(quality) = quality {
            name.push_str(&format!(" [{quality}]"));
        }
        if let Some(part_name) = part_name {
            name.push_str(&format!(" - {}", sanitize(part_name)));
        }
        if let Some(part_number) = part_number {
            name.push_str(&format!(" - pt{part_number}"));
        }
        format!("{name}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenarr_core::models::event::Sport;
    use chrono::{TimeZone, Utc};

    fn event() -> Event {
        let mut event = Event::new("UFC 310: Pantoja vs Asakura".to_string(), Sport::Fighting);
        event.event_date = Some(Utc.with_ymd_and_hms(2024, 12, 7, 0, 0, 0).unwrap());
        event
    }

    #[test]
    fn folder_name_includes_year_and_drops_hostile_chars() {
        let builder = DefaultNameBuilder;
        assert_eq!(
            builder.folder_name(&event()),
            "UFC 310 Pantoja vs Asakura (2024)"
        );
    }

    #[test]
    fn file_name_carries_quality_and_part_suffix() {
        let builder = DefaultNameBuilder;
        let name = builder.file_name(
            &event(),
            Some("WEBDL-1080p"),
            Some("Early Prelims"),
            Some(1),
            "mkv",
        );
        assert_eq!(
            name,
            "UFC 310 Pantoja vs Asakura [WEBDL-1080p] - Early Prelims - pt1.mkv"
        );
    }
}
