use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::forecast::PeriodSummary;

/// Keyword in the (lowercased) description and the advice it triggers; first match wins
const DESCRIPTION_ADVICE: &[(&str, &str)] = &[
    ("дощ", "Візьми парасольку ☔ та насолоджуйся кавою вдома!"),
    ("гроза", "Будь обережний! ⚡ Краще залишитись вдома."),
    ("сніг", "Чудовий день для снігових прогулянок ❄️"),
    ("туман", "Будь обережний на дорозі 🌫"),
];

const COLD_THRESHOLD: i32 = 5;
const HOT_THRESHOLD: i32 = 25;

const COLD_ADVICE: &str = "Тепло одягайся 🧥!";
const HOT_ADVICE: &str = "Легкий одяг 👕 та пий багато води 💦";
const DEFAULT_ADVICE: &str = "Чудовий день, насолоджуйся 🌤";

/// The calendar day after `now` in `timezone`
pub fn target_date(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    let today = now.with_timezone(&timezone).date_naive();
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

/// `dd.mm.yyyy`
pub fn date_label(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub fn advice(day: &PeriodSummary) -> &'static str {
    let description = day.description.to_lowercase();

    if let Some(&(_, advice)) = DESCRIPTION_ADVICE
        .iter()
        .find(|(keyword, _)| description.contains(*keyword))
    {
        return advice;
    }

    if day.temperature < COLD_THRESHOLD {
        COLD_ADVICE
    } else if day.temperature > HOT_THRESHOLD {
        HOT_ADVICE
    } else {
        DEFAULT_ADVICE
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Format wind like `4.5`, dropping a trailing `.0`
fn format_wind(speed: f64) -> String {
    let rounded = (speed * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Build the HTML caption. `footer` is trusted markup and is appended verbatim.
pub fn build_caption(
    location: &str,
    date_label: &str,
    day: &PeriodSummary,
    footer: Option<&str>,
) -> String {
    let mut caption = format!(
        "🌤 <b>Погода у {} на завтра ({})</b>\n\n💧 Вологість: <b>{}%</b>\n💨 Вітер: <b>{} м/с</b>\n\n⚓ <b>Порада:</b> {}",
        escape_html(location),
        escape_html(date_label),
        day.humidity,
        format_wind(day.wind_speed),
        advice(day),
    );

    if let Some(footer) = footer.filter(|f| !f.trim().is_empty()) {
        caption.push_str("\n\n");
        caption.push_str(footer);
    }

    caption
}
