//! Human-readable message templating.
//!
//! Pure, stateless formatting. Anything that decides *whether* to send a
//! message lives in `events` or `broadcast`; this module only builds text.

use crate::sensor::SensorReading;

/// The canonical laundry question, also asked on behalf of every user by
/// the broadcast sweep so that answers share one cache slot.
pub const DRYING_QUESTION: &str = "ตอนนี้ควรตากผ้าไหม";

/// Direct status summary with a drying-conditions hint.
pub fn status_report(reading: &SensorReading) -> String {
    format!(
        "Current conditions:\n- light: {:.0} lux\n- temperature: {:.1} \u{b0}C\n- humidity: {:.1} %\n{}",
        reading.light,
        reading.temperature,
        reading.humidity,
        drying_hint(reading),
    )
}

/// Body of the periodic broadcast. The advice line comes from the model
/// when available; callers pass `None` to fall back to the plain summary.
pub fn broadcast_report(reading: &SensorReading, advice: Option<&str>) -> String {
    match advice {
        Some(advice) => format!("{}\n- advice: {}", status_report(reading), advice.trim()),
        None => status_report(reading),
    }
}

/// Frame a model answer under the question it answers.
pub fn answer_reply(question: &str, answer: &str) -> String {
    let question = question.trim().trim_end_matches(['?', '\u{ff1f}']);
    format!("{question}?\n- answer: {}", answer.trim())
}

pub fn no_data_message() -> String {
    "No sensor data yet. Please try again once the sensor has reported a reading.".into()
}

pub fn ack_message() -> String {
    "Let me check the current conditions, one moment...".into()
}

pub fn failure_notice() -> String {
    "Sorry, I could not get an answer right now. Please try again in a little while.".into()
}

fn drying_hint(reading: &SensorReading) -> &'static str {
    if reading.light > 10_000.0 && reading.humidity < 70.0 {
        "Looks like good drying weather."
    } else {
        "Not ideal for drying laundry right now."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(light: f64, temperature: f64, humidity: f64) -> SensorReading {
        SensorReading { light, temperature, humidity }
    }

    #[test]
    fn status_report_lists_all_three_fields() {
        let text = status_report(&reading(20_000.0, 32.0, 55.0));
        assert!(text.contains("20000 lux"));
        assert!(text.contains("32.0 \u{b0}C"));
        assert!(text.contains("55.0 %"));
    }

    #[test]
    fn bright_and_dry_reads_as_good_drying_weather() {
        let text = status_report(&reading(20_000.0, 32.0, 55.0));
        assert!(text.contains("good drying weather"));
    }

    #[test]
    fn humid_conditions_read_as_not_ideal() {
        let text = status_report(&reading(20_000.0, 28.0, 85.0));
        assert!(text.contains("Not ideal"));
    }

    #[test]
    fn answer_reply_strips_question_marks_before_framing() {
        let text = answer_reply("ตอนนี้ควรตากผ้าไหม?", " yes, hang them out ");
        assert_eq!(text, "ตอนนี้ควรตากผ้าไหม?\n- answer: yes, hang them out");
    }

    #[test]
    fn broadcast_report_appends_advice_when_present() {
        let r = reading(500.0, 24.0, 80.0);
        let with = broadcast_report(&r, Some("keep them inside"));
        assert!(with.ends_with("- advice: keep them inside"));
        assert_eq!(broadcast_report(&r, None), status_report(&r));
    }
}
