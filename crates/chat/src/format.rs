//! Chat line formatting.

use chrono::{DateTime, Local, TimeZone};

use crate::events::ChatLine;

pub fn format_message(username: &str, text: &str) -> ChatLine {
    format_message_at(username, text, Local::now())
}

pub fn format_message_at<Tz: TimeZone>(username: &str, text: &str, at: DateTime<Tz>) -> ChatLine
where
    Tz::Offset: std::fmt::Display,
{
    ChatLine {
        username: username.to_string(),
        text: text.to_string(),
        time: at.format("%-I:%M %P").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn time_is_twelve_hour_clock() {
        let afternoon = Utc.with_ymd_and_hms(2021, 5, 1, 15, 7, 0).unwrap();
        let line = format_message_at("bot", "hello", afternoon);
        assert_eq!(line.time, "3:07 pm");

        let midnight = Utc.with_ymd_and_hms(2021, 5, 1, 0, 30, 0).unwrap();
        assert_eq!(format_message_at("bot", "hi", midnight).time, "12:30 am");
    }
}
