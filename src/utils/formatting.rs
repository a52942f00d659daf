use time::macros::format_description;
use time::{format_description, OffsetDateTime};

const DATETIME_FORMAT: &[format_description::FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

pub fn format_utc(date_time: impl Into<OffsetDateTime>) -> String {
    let offset_date_time: OffsetDateTime = date_time.into();
    offset_date_time
        .format(DATETIME_FORMAT)
        .unwrap_or_else(|_| offset_date_time.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use test_log::test;
    use time::macros::datetime;

    use super::format_utc;

    #[test]
    fn formats_minutes_precision() {
        assert_eq!(format_utc(datetime!(2026-03-01 18:05:59 UTC)), "2026-03-01 18:05");
    }
}
