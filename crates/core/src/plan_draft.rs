//! Turning an assistant reply into plan milestones, plus the fallback plan.

use chrono::Duration;
use serde::Deserialize;

use crate::error::CoreError;
use crate::plan::NewMilestone;
use crate::types::Date;

/// Horizon used when a plan has no target date.
pub const DEFAULT_PLAN_HORIZON_DAYS: i64 = 90;

const FALLBACK_TITLES: [&str; 3] = ["Get started", "Build momentum", "Finish strong"];

#[derive(Debug, Deserialize)]
struct DraftPlan {
    milestones: Vec<NewMilestone>,
}

/// Instruction sent to the assistant when drafting a plan.
pub fn build_plan_prompt(goal_type: &str, goal: &str, today: Date, target_date: Date) -> String {
    format!(
        "Create a milestone plan for the goal below. Respond with JSON only, shaped as \
         {{\"milestones\":[{{\"title\":\"\",\"description\":\"\",\"startDate\":\"YYYY-MM-DD\",\
         \"dueDate\":\"YYYY-MM-DD\",\"blindSpotTip\":\"\",\"strengthHook\":\"\"}}]}}. \
         Use 3 to 6 milestones between {today} and {target_date}.\n\n\
         Goal type: {goal_type}\nGoal: {goal}"
    )
}

/// Return the first balanced `{...}` object in `text`, skipping braces that
/// appear inside JSON strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse an assistant reply into milestones.
///
/// The reply may wrap the JSON in prose or a fenced code block.
pub fn parse_plan_reply(reply: &str) -> Result<Vec<NewMilestone>, CoreError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| CoreError::Validation("Assistant reply contained no JSON object".into()))?;
    let draft: DraftPlan = serde_json::from_str(json)
        .map_err(|e| CoreError::Validation(format!("Assistant plan JSON is invalid: {e}")))?;
    if draft.milestones.is_empty() {
        return Err(CoreError::Validation(
            "Assistant plan has no milestones".into(),
        ));
    }
    Ok(draft.milestones)
}

/// Three evenly spaced milestones covering `[today, target_date]`.
pub fn fallback_milestones(goal: &str, today: Date, target_date: Option<Date>) -> Vec<NewMilestone> {
    let end = target_date
        .filter(|d| *d >= today)
        .unwrap_or(today + Duration::days(DEFAULT_PLAN_HORIZON_DAYS));
    let total_days = (end - today).num_days();
    let parts = FALLBACK_TITLES.len() as i64;

    let mut milestones = Vec::with_capacity(FALLBACK_TITLES.len());
    let mut start = today;
    for (i, title) in FALLBACK_TITLES.iter().enumerate() {
        let i = i as i64;
        let due = if i == parts - 1 {
            end
        } else {
            (today + Duration::days(total_days * (i + 1) / parts)).max(start)
        };
        milestones.push(NewMilestone {
            title: (*title).to_string(),
            description: format!("Phase {} of {parts} toward: {goal}", i + 1),
            start_date: start,
            due_date: due,
            blind_spot_tip: None,
            strength_hook: None,
        });
        start = (due + Duration::days(1)).min(end);
    }
    milestones
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn extracts_object_from_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"milestones\": [{\"title\": \"a}b\"}]}\n```\nGood luck!";
        assert_eq!(
            extract_json_object(reply),
            Some("{\"milestones\": [{\"title\": \"a}b\"}]}")
        );
    }

    #[test]
    fn extract_returns_none_for_unbalanced_text() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"open\": true"), None);
    }

    #[test]
    fn parses_valid_reply() {
        let reply = r#"{"milestones":[{"title":"Base fitness","description":"Walk daily",
            "startDate":"2026-01-01","dueDate":"2026-01-31","strengthHook":"You love routine"}]}"#;
        let milestones = parse_plan_reply(reply).unwrap();
        assert_eq!(milestones.len(), 1);
        assert_eq!(milestones[0].due_date, date(2026, 1, 31));
        assert_eq!(milestones[0].strength_hook.as_deref(), Some("You love routine"));
    }

    #[test]
    fn rejects_empty_or_malformed_plans() {
        assert!(parse_plan_reply(r#"{"milestones":[]}"#).is_err());
        assert!(parse_plan_reply(r#"{"steps":[]}"#).is_err());
        assert!(parse_plan_reply("I cannot help with that").is_err());
    }

    #[test]
    fn fallback_splits_window_evenly() {
        let milestones = fallback_milestones("Learn Spanish", date(2026, 1, 1), Some(date(2026, 3, 31)));
        assert_eq!(milestones.len(), 3);
        assert_eq!(milestones[0].start_date, date(2026, 1, 1));
        assert_eq!(milestones[0].due_date, date(2026, 1, 30));
        assert_eq!(milestones[1].start_date, date(2026, 1, 31));
        assert_eq!(milestones[2].due_date, date(2026, 3, 31));
        assert!(milestones.iter().all(|m| m.start_date <= m.due_date));
    }

    #[test]
    fn fallback_defaults_to_ninety_days() {
        let milestones = fallback_milestones("Save money", date(2026, 1, 1), None);
        assert_eq!(milestones[2].due_date, date(2026, 4, 1));
    }

    #[test]
    fn fallback_handles_same_day_target() {
        let today = date(2026, 6, 1);
        let milestones = fallback_milestones("Ship it", today, Some(today));
        assert!(milestones.iter().all(|m| m.start_date == today && m.due_date == today));
    }
}
