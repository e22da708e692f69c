// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Team statistics and Slack-style message rendering.
//!
//! Everything here is pure: rows in, text out.

use crate::models::{RecoveryRecord, SleepRecord, TeamRow};
use chrono::{Datelike, Utc, Weekday};
use serde::Serialize;
use std::fmt::Write;

/// Team mood, from the mean of average recovery and average sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMood {
    OnFire,
    FeelingStrong,
    ReadyToGo,
    NeedsCoffee,
    NeedsExtraCare,
}

impl TeamMood {
    pub fn from_averages(avg_recovery: f64, avg_sleep: f64) -> Self {
        let avg = (avg_recovery + avg_sleep) / 2.0;
        if avg >= 75.0 {
            TeamMood::OnFire
        } else if avg >= 60.0 {
            TeamMood::FeelingStrong
        } else if avg >= 45.0 {
            TeamMood::ReadyToGo
        } else if avg >= 30.0 {
            TeamMood::NeedsCoffee
        } else {
            TeamMood::NeedsExtraCare
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TeamMood::OnFire => "on fire",
            TeamMood::FeelingStrong => "feeling strong",
            TeamMood::ReadyToGo => "ready to go",
            TeamMood::NeedsCoffee => "needs coffee",
            TeamMood::NeedsExtraCare => "needs extra care",
        }
    }

    /// Line shown in the team overview.
    pub fn headline(self) -> &'static str {
        match self {
            TeamMood::OnFire => "🔥 Team is ON FIRE!",
            TeamMood::FeelingStrong => "💪 Team is feeling strong!",
            TeamMood::ReadyToGo => "⚡ Team is ready to go!",
            TeamMood::NeedsCoffee => "☕ Team needs more coffee...",
            TeamMood::NeedsExtraCare => "🆘 Team needs extra care today!",
        }
    }
}

/// Aggregate statistics over a set of team rows.
///
/// Averages only include rows that have the metric; with no such rows the
/// average is 0 and renders as "N/A".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    pub avg_recovery: f64,
    pub avg_sleep: f64,
    pub total_sleep_hours: f64,
    /// Rows contributing to `avg_recovery`
    pub recovery_count: usize,
    /// Rows contributing to `avg_sleep`
    pub sleep_count: usize,
    pub mood: TeamMood,
}

impl TeamSummary {
    /// No row carried any metric.
    pub fn is_empty(&self) -> bool {
        self.recovery_count == 0 && self.sleep_count == 0
    }
}

pub fn compute_team_summary(rows: &[TeamRow]) -> TeamSummary {
    let recovery: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.latest.recovery.as_ref())
        .map(|r| r.score as f64)
        .collect();
    let sleep: Vec<&SleepRecord> = rows.iter().filter_map(|r| r.latest.sleep.as_ref()).collect();

    let avg_recovery = mean(&recovery);
    let avg_sleep = mean(&sleep.iter().map(|s| s.score as f64).collect::<Vec<_>>());
    let total_sleep_hours = sleep.iter().map(|s| s.duration_hours()).sum();

    TeamSummary {
        avg_recovery,
        avg_sleep,
        total_sleep_hours,
        recovery_count: recovery.len(),
        sleep_count: sleep.len(),
        mood: TeamMood::from_averages(avg_recovery, avg_sleep),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Whole-percent score, or "N/A" for 0.
pub fn format_score(score: f64) -> String {
    if score == 0.0 {
        "N/A".to_string()
    } else {
        format!("{:.0}%", score)
    }
}

pub fn recovery_badge(score: i32) -> &'static str {
    match score {
        s if s >= 75 => "🟢",
        s if s >= 50 => "🟡",
        s if s >= 25 => "🟠",
        _ => "🔴",
    }
}

pub fn sleep_glyph(score: i32) -> &'static str {
    match score {
        s if s >= 80 => "😴",
        s if s >= 60 => "😊",
        s if s >= 40 => "😐",
        _ => "😵",
    }
}

fn recovery_clause(recovery: &RecoveryRecord) -> String {
    let mut text = format!(
        "Recovery: {} {}%",
        recovery_badge(recovery.score),
        recovery.score
    );
    if recovery.hrv_ms > 0.0 && recovery.resting_hr > 0 {
        let _ = write!(
            text,
            " (HRV: {:.1}ms, RHR: {}bpm)",
            recovery.hrv_ms, recovery.resting_hr
        );
    }
    text
}

fn sleep_clause(sleep: &SleepRecord) -> String {
    let mut text = format!(
        "Sleep: {} {}% ({:.1}h",
        sleep_glyph(sleep.score),
        sleep.score,
        sleep.duration_hours()
    );
    if sleep.efficiency > 0.0 {
        let _ = write!(text, ", {:.0}% eff", sleep.efficiency);
    }
    text.push(')');
    text
}

/// One bullet line for a team member.
pub fn format_individual(row: &TeamRow) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(recovery) = &row.latest.recovery {
        parts.push(recovery_clause(recovery));
    }
    if let Some(sleep) = &row.latest.sleep {
        parts.push(sleep_clause(sleep));
    }
    if parts.is_empty() {
        parts.push("No recent data 📊".to_string());
    }

    format!("• *{}:* {}", row.display_label(), parts.join(" • "))
}

/// Standup message for the current UTC weekday.
pub fn format_team_standup(rows: &[TeamRow]) -> String {
    format_team_standup_on(rows, Utc::now().weekday())
}

/// Standup message with the closer chosen for `weekday`.
pub fn format_team_standup_on(rows: &[TeamRow], weekday: Weekday) -> String {
    if rows.is_empty() {
        return "🌅 *Good Morning Team!* 🌅\n\n\
                No WHOOP data available yet. Connect your WHOOP accounts with \
                `/connect-whoop` to see your daily stats! 🚀"
            .to_string();
    }

    let summary = compute_team_summary(rows);
    let mut message = String::new();

    message.push_str("🌅 *Good Morning Team! Here's how everyone's feeling today:* 🌅\n\n");

    let _ = writeln!(message, "📊 *Team Overview:* {}", summary.mood.headline());
    let _ = writeln!(
        message,
        "• Average Recovery: {}",
        format_score(summary.avg_recovery)
    );
    let _ = writeln!(
        message,
        "• Average Sleep Score: {}",
        format_score(summary.avg_sleep)
    );
    let _ = writeln!(
        message,
        "• Team Sleep Hours: {:.1}h total\n",
        summary.total_sleep_hours
    );

    message.push_str("👥 *Individual Stats:*\n");
    for row in rows {
        message.push_str(&format_individual(row));
        message.push('\n');
    }

    let _ = write!(
        message,
        "\n🌟 {} {}\n\n\
         _💡 Pro tip: Use `/whoop-status` to check individual stats or \
         `/morning-report` for a fresh update!_",
        weekday_closer(weekday),
        performance_note(summary.avg_recovery)
    );

    message
}

fn weekday_closer(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Let's crush this Monday! 💪",
        Weekday::Tue => "Tuesday momentum building! 🚀",
        Weekday::Wed => "Hump day hustle! 🐪",
        Weekday::Thu => "Thursday thunder! ⚡",
        Weekday::Fri => "Friday finisher! 🎉",
        Weekday::Sat => "Saturday vibes! 🌟",
        Weekday::Sun => "Sunday reset! 🧘",
    }
}

fn performance_note(avg_recovery: f64) -> &'static str {
    if avg_recovery >= 70.0 {
        "The team is well-recovered and ready for anything!"
    } else if avg_recovery >= 50.0 {
        "Good recovery levels - steady as she goes!"
    } else if avg_recovery > 0.0 {
        "Take it easy today and focus on recovery!"
    } else {
        ""
    }
}

/// Detailed single-user view. Each metric section appears only if present.
pub fn format_user_status(row: &TeamRow) -> String {
    let latest = &row.latest;
    let mut message = format!("📊 *WHOOP Status for {}*\n\n", row.display_label());

    if let Some(recovery) = &latest.recovery {
        let _ = writeln!(
            message,
            "🔋 *Recovery:* {} {}%",
            recovery_badge(recovery.score),
            recovery.score
        );
        if recovery.hrv_ms > 0.0 {
            let _ = writeln!(message, "   • HRV: {:.1}ms", recovery.hrv_ms);
        }
        if recovery.resting_hr > 0 {
            let _ = writeln!(message, "   • Resting HR: {} bpm", recovery.resting_hr);
        }
        let _ = writeln!(message, "   • Date: {}\n", recovery.date);
    }

    if let Some(sleep) = &latest.sleep {
        let _ = writeln!(
            message,
            "😴 *Sleep:* {} {}%",
            sleep_glyph(sleep.score),
            sleep.score
        );
        let _ = writeln!(message, "   • Duration: {:.1} hours", sleep.duration_hours());
        if sleep.efficiency > 0.0 {
            let _ = writeln!(message, "   • Efficiency: {:.0}%", sleep.efficiency);
        }
        let _ = writeln!(message, "   • Date: {}\n", sleep.date);
    }

    if let Some(strain) = &latest.strain {
        let _ = writeln!(message, "💪 *Strain:* {:.1}", strain.score);
        let _ = writeln!(message, "   • Date: {}\n", strain.date);
    }

    if latest.is_empty() {
        message.push_str("No WHOOP data available. Make sure your WHOOP account is connected!\n\n");
    }

    message.push_str("_Use `/connect-whoop` to link your account or `/morning-report` for team stats!_");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_thresholds() {
        assert_eq!(TeamMood::from_averages(80.0, 70.0), TeamMood::OnFire);
        assert_eq!(TeamMood::from_averages(60.0, 60.0), TeamMood::FeelingStrong);
        assert_eq!(TeamMood::from_averages(50.0, 40.0), TeamMood::ReadyToGo);
        assert_eq!(TeamMood::from_averages(30.0, 30.0), TeamMood::NeedsCoffee);
        assert_eq!(TeamMood::from_averages(0.0, 0.0), TeamMood::NeedsExtraCare);
        assert_eq!(TeamMood::NeedsCoffee.label(), "needs coffee");
    }

    #[test]
    fn test_badges() {
        assert_eq!(recovery_badge(75), "🟢");
        assert_eq!(recovery_badge(74), "🟡");
        assert_eq!(recovery_badge(25), "🟠");
        assert_eq!(recovery_badge(24), "🔴");
        assert_eq!(sleep_glyph(80), "😴");
        assert_eq!(sleep_glyph(60), "😊");
        assert_eq!(sleep_glyph(40), "😐");
        assert_eq!(sleep_glyph(0), "😵");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0.0), "N/A");
        assert_eq!(format_score(70.0), "70%");
        assert_eq!(format_score(66.4), "66%");
    }

    #[test]
    fn test_performance_note() {
        assert_eq!(
            performance_note(70.0),
            "The team is well-recovered and ready for anything!"
        );
        assert_eq!(
            performance_note(50.0),
            "Good recovery levels - steady as she goes!"
        );
        assert_eq!(
            performance_note(10.0),
            "Take it easy today and focus on recovery!"
        );
        assert_eq!(performance_note(0.0), "");
    }
}
