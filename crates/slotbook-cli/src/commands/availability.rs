//! Slot queries and weekly template management.

use chrono::{NaiveDate, NaiveTime};

use slotbook_core::WindowInput;

use super::Session;
use crate::error::CliResult;
use crate::render;

/// Bookable slots from `start` to `end` (defaults to `start`).
pub async fn slots(
    session: &Session,
    provider_id: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> CliResult<String> {
    let end = end.unwrap_or(start);
    let slots = session
        .orchestrator()
        .get_available_slots(provider_id, start, end)
        .await?;
    render::slots(&slots, session.format)
}

pub async fn template(session: &Session, provider_id: &str) -> CliResult<String> {
    let windows = session
        .orchestrator()
        .get_expert_availability(provider_id)
        .await?;
    render::windows(&windows, session.format)
}

pub async fn add_window(
    session: &Session,
    provider_id: &str,
    day_of_week: u8,
    start: NaiveTime,
    end: NaiveTime,
    available: bool,
) -> CliResult<String> {
    let input = WindowInput::new(day_of_week, start, end).with_available(available);
    let window = session
        .orchestrator()
        .manual()
        .save_window(provider_id, &input)
        .await?;
    session.save().await?;
    render::window(&window, session.format)
}

pub async fn remove_window(
    session: &Session,
    provider_id: &str,
    window_id: &str,
) -> CliResult<String> {
    session
        .orchestrator()
        .manual()
        .delete_window(provider_id, window_id)
        .await?;
    session.save().await?;
    Ok(format!("removed window {}", window_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::session;
    use crate::error::CliError;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn added_windows_show_up_as_slots() {
        let session = session();
        add_window(&session, "p1", 1, hm(9, 0), hm(12, 0), true)
            .await
            .unwrap();
        add_window(&session, "p1", 1, hm(14, 0), hm(15, 0), false)
            .await
            .unwrap();

        let text = slots(&session, "p1", monday(), None).await.unwrap();
        assert_eq!(text, "2025-03-03 Mon  09:00-12:00");

        let text = template(&session, "p1").await.unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("(unavailable)"));
    }

    #[tokio::test]
    async fn invalid_window_is_rejected() {
        let session = session();
        let err = add_window(&session, "p1", 1, hm(12, 0), hm(9, 0), true)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Engine(_)));
        assert_eq!(template(&session, "p1").await.unwrap(), "No weekly windows");
    }

    #[tokio::test]
    async fn remove_unknown_window_errors() {
        let session = session();
        let err = remove_window(&session, "p1", "missing").await.unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
