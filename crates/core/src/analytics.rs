// Per-project analytics and the reports derived from them

use crate::time::{format_day, format_duration, now};
use crate::types::{
    ActivityEvent, ActivityKind, HealthFactor, HealthFactorKind, Project, ProjectHealth,
    ProjectWithAnalytics, StatusEntry, TechnologyStats,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Window used by the activity heat map unless the caller asks for another
pub const HEAT_MAP_DAYS: i64 = 7;

/// Window used by the activity factor of the health score
pub const HEALTH_ACTIVITY_DAYS: i64 = 30;

const RECENT_ADOPTIONS: usize = 5;

/// State captured by [`AnalyticsEngine::checkpoint`]
#[derive(Debug)]
pub struct Checkpoint {
    name: String,
    record: Option<ProjectWithAnalytics>,
    tech_stats: TechnologyStats,
}

/// Status history, activity logs, and technology usage for every project.
///
/// Mutators are plain `&mut self` methods; the project store owns the engine
/// inside its worker task, which serializes every call. Reports are pure
/// functions of the current records and an explicit `now`.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {
    projects: BTreeMap<String, ProjectWithAnalytics>,
    tech_stats: TechnologyStats,
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted technology statistics
    pub fn with_technology_stats(mut stats: TechnologyStats) -> Self {
        stats.normalize();
        Self {
            projects: BTreeMap::new(),
            tech_stats: stats,
        }
    }

    /// Insert or replace a record and fold its technology tags into the global stats
    pub fn update_project(&mut self, record: ProjectWithAnalytics) {
        let at = now();
        for tech in &record.project.tech_stack {
            self.tech_stats.record(tech, &record.project.name, at);
        }
        self.projects.insert(record.project.name.clone(), record);
    }

    /// Copy the canonical project fields into its analytics record.
    ///
    /// Projects without a record are migrated, so their history starts at the
    /// project's last modification.
    pub fn sync_project(&mut self, project: &Project) {
        let record = self.projects.remove(&project.name);
        self.update_project(merge(record, project));
    }

    /// Load a persisted record at startup; the canonical project document wins.
    ///
    /// Unlike [`update_project`](Self::update_project) this only folds
    /// technology pairs the stats have never seen, dated at the project's
    /// last modification. Returns false when the project had no record and
    /// was migrated.
    pub fn restore(&mut self, project: &Project, record: Option<ProjectWithAnalytics>) -> bool {
        let existed = record.is_some();
        let record = merge(record, project);
        for tech in &record.project.tech_stack {
            let known = self
                .tech_stats
                .projects_using
                .get(tech)
                .is_some_and(|projects| projects.iter().any(|p| p == &project.name));
            if !known {
                self.tech_stats.record(tech, &project.name, project.last_modified);
            }
        }
        self.projects.insert(project.name.clone(), record);
        existed
    }

    /// Append an event to a project's activity log. Returns false for unknown projects.
    pub fn record_activity(&mut self, name: &str, kind: ActivityKind, description: Option<String>) -> bool {
        match self.projects.get_mut(name) {
            Some(record) => {
                record.activity_log.push(ActivityEvent::new(kind, description));
                true
            }
            None => false,
        }
    }

    /// Close the open status period and open a new one.
    ///
    /// At most one history entry is open afterwards, and it is the last one.
    pub fn update_status(&mut self, name: &str, new_status: &str) -> bool {
        let Some(record) = self.projects.get_mut(name) else {
            return false;
        };

        let at = now();
        for entry in record.status_history.iter_mut().filter(|e| e.is_open()) {
            entry.end_date = Some(at);
        }
        record.status_history.push(StatusEntry::open(new_status, at));
        record.project.status = Some(new_status.to_string());
        record.activity_log.push(ActivityEvent {
            timestamp: at,
            kind: ActivityKind::StatusChange,
            description: Some(format!("Status changed to: {}", new_status)),
        });
        true
    }

    /// Record a newly opened task; reopening a completed one takes it off the completed list
    pub fn add_task(&mut self, name: &str, task: &str) -> bool {
        let Some(record) = self.projects.get_mut(name) else {
            return false;
        };
        record.completed_tasks.retain(|t| t != task);
        record
            .activity_log
            .push(ActivityEvent::new(ActivityKind::TaskAdded, Some(task.to_string())));
        true
    }

    /// Record a finished task. The task must already be gone from the current list.
    pub fn complete_task(&mut self, name: &str, task: &str) -> bool {
        let Some(record) = self.projects.get_mut(name) else {
            return false;
        };
        if !record.completed_tasks.iter().any(|t| t == task) {
            record.completed_tasks.push(task.to_string());
        }
        record.activity_log.push(ActivityEvent::new(
            ActivityKind::TaskCompleted,
            Some(task.to_string()),
        ));
        true
    }

    /// Remember one project's record and the global stats so a failed write can be undone
    pub fn checkpoint(&self, name: &str) -> Checkpoint {
        Checkpoint {
            name: name.to_string(),
            record: self.projects.get(name).cloned(),
            tech_stats: self.tech_stats.clone(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        match checkpoint.record {
            Some(record) => {
                self.projects.insert(checkpoint.name, record);
            }
            None => {
                self.projects.remove(&checkpoint.name);
            }
        }
        self.tech_stats = checkpoint.tech_stats;
    }

    pub fn get(&self, name: &str) -> Option<&ProjectWithAnalytics> {
        self.projects.get(name)
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn technology_stats(&self) -> &TechnologyStats {
        &self.tech_stats
    }

    /// Weighted sum of the events newer than `since`
    pub fn activity_score<'a>(events: impl IntoIterator<Item = &'a ActivityEvent>, since: DateTime<Utc>) -> u32 {
        events
            .into_iter()
            .filter(|e| e.timestamp > since)
            .map(|e| e.kind.weight())
            .sum()
    }

    /// Health score from activity, staleness, documentation, and task completion
    pub fn project_health(record: &ProjectWithAnalytics, now: DateTime<Utc>) -> ProjectHealth {
        let since = now - Duration::days(HEALTH_ACTIVITY_DAYS);
        let recent_events = record.activity_log.iter().filter(|e| e.timestamp > since).count();
        let activity = (Self::activity_score(&record.activity_log, since) * 5).min(100);

        let elapsed = (now - record.project.last_modified).num_seconds().max(0);
        let penalty = elapsed * 10 / 86_400;
        let staleness = (100 - penalty).max(0) as u32;

        let has_description = record
            .project
            .description
            .as_deref()
            .is_some_and(|d| !d.is_empty());
        let has_notes = record.project.notes.as_deref().is_some_and(|n| !n.is_empty());
        let documentation = 50 * u32::from(has_description) + 50 * u32::from(has_notes);

        let completed = record.completed_tasks.len();
        let total = record.total_tasks();
        let completion = if total > 0 {
            (completed * 100 / total) as u32
        } else {
            50
        };

        let factors = vec![
            HealthFactor {
                kind: HealthFactorKind::Activity,
                score: activity,
                description: format!("{} events in last {} days", recent_events, HEALTH_ACTIVITY_DAYS),
            },
            HealthFactor {
                kind: HealthFactorKind::Staleness,
                score: staleness,
                description: format!("Last updated {} days ago", elapsed / 86_400),
            },
            HealthFactor {
                kind: HealthFactorKind::Documentation,
                score: documentation,
                description: if has_description && has_notes {
                    "Well documented".to_string()
                } else {
                    "Needs more documentation".to_string()
                },
            },
            HealthFactor {
                kind: HealthFactorKind::Completion,
                score: completion,
                description: format!("{}/{} tasks completed", completed, total),
            },
        ];

        let score = factors.iter().map(|f| f.score).sum::<u32>() / factors.len() as u32;

        let mut recommendations = Vec::new();
        if activity < 30 {
            recommendations.push("Increase project activity".to_string());
        }
        if staleness < 50 {
            recommendations.push("Update project status".to_string());
        }
        if documentation < 50 {
            recommendations.push("Add project documentation".to_string());
        }
        if completion < 30 && total > 0 {
            recommendations.push("Focus on completing tasks".to_string());
        }

        ProjectHealth {
            score,
            factors,
            recommendations,
        }
    }

    /// How long the project has spent in each status
    pub fn status_timeline(&self, name: &str, now: DateTime<Utc>) -> Option<String> {
        let record = self.projects.get(name)?;
        let mut out = format!("## Status Timeline for {}\n\n", name);

        if let (Some(status), Some(current)) = (&record.project.status, record.current_status_entry()) {
            let _ = write!(
                out,
                "**Current Status**: {} (for {})\n\n",
                status,
                format_duration(current.duration_secs(now))
            );
        }

        let previous: Vec<&StatusEntry> = record.status_history.iter().filter(|e| !e.is_open()).collect();
        if !previous.is_empty() {
            out.push_str("### Previous Statuses:\n");
            for entry in previous.iter().rev() {
                let _ = writeln!(
                    out,
                    "- **{}**: {}",
                    entry.status,
                    format_duration(entry.duration_secs(now))
                );
            }
            out.push('\n');
        }

        let age = (now - record.created_date).num_seconds();
        let _ = write!(out, "**Total Project Age**: {}", format_duration(age));
        Some(out)
    }

    /// Projects ranked by activity over the last `days` days, then a per-day count
    pub fn activity_heat_map(&self, days: i64, now: DateTime<Utc>) -> String {
        let since = now - Duration::days(days);

        let mut ranking: Vec<(&str, u32, usize)> = self
            .projects
            .values()
            .map(|record| {
                let score = Self::activity_score(&record.activity_log, since);
                let events = record.activity_log.iter().filter(|e| e.timestamp > since).count();
                (record.name(), score, events)
            })
            .collect();
        ranking.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut out = format!("## Project Activity Heat Map (Past {} Days)\n\n", days);
        if ranking.is_empty() {
            out.push_str("No projects tracked yet.\n");
        }
        for (name, score, events) in &ranking {
            let _ = write!(out, "{} **{}** ({} activity points", heat_marker(*score), name, score);
            if *events > 0 {
                let _ = write!(out, " - {} events", events);
            }
            out.push_str(")\n");
        }

        let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for record in self.projects.values() {
            for event in record.activity_log.iter().filter(|e| e.timestamp > since) {
                *daily.entry(event.timestamp.date_naive()).or_default() += 1;
            }
        }

        out.push_str("\n### Daily Activity Breakdown:\n");
        for (day, count) in daily {
            let _ = writeln!(out, "- {}: {} events", day.format("%A, %b %-d"), count);
        }
        out
    }

    /// Technology usage, emerging technologies, and recent adoptions
    pub fn technology_trends(&self) -> String {
        let stats = &self.tech_stats;
        let total = self.projects.len();
        let mut out = String::from("## Technology Analysis\n\n");

        let mut by_usage: Vec<(&String, usize)> = stats
            .framework_counts
            .iter()
            .map(|(tech, count)| (tech, *count))
            .collect();
        by_usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        if by_usage.is_empty() {
            out.push_str("No technology data recorded yet.\n");
            return out;
        }

        out.push_str("### Framework Usage:\n");
        for (tech, count) in &by_usage {
            let projects = stats.projects_using.get(*tech).cloned().unwrap_or_default();
            let _ = writeln!(
                out,
                "- **{}**: {}% of projects ({}/{})",
                tech,
                stats.usage_percentage(tech, total),
                count,
                total
            );
            if projects.len() <= 3 {
                let _ = writeln!(out, "  - Used in: {}", projects.join(", "));
            }
        }

        let emerging: Vec<_> = by_usage.iter().filter(|(_, count)| (1..=2).contains(count)).collect();
        if !emerging.is_empty() {
            out.push_str("\n### Emerging Technologies:\n");
            for (tech, _) in emerging {
                if let Some(projects) = stats.projects_using.get(*tech) {
                    let _ = writeln!(out, "- **{}** (exploring in: {})", tech, projects.join(", "));
                }
            }
        }

        let mut recent: Vec<(&String, &DateTime<Utc>)> = stats.last_used.iter().collect();
        recent.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        out.push_str("\n### Recent Technology Adoptions:\n");
        for (tech, date) in recent.into_iter().take(RECENT_ADOPTIONS) {
            let _ = writeln!(out, "- {}: Last used {}", tech, format_day(date));
        }
        out
    }

    /// Projects grouped into critical, needs-attention, and healthy buckets
    pub fn health_report(&self, now: DateTime<Utc>) -> String {
        let mut scored: Vec<(&str, ProjectHealth)> = self
            .projects
            .values()
            .map(|record| (record.name(), Self::project_health(record, now)))
            .collect();
        scored.sort_by(|a, b| b.1.score.cmp(&a.1.score).then_with(|| a.0.cmp(b.0)));

        let mut out = String::from("## Project Health Report\n\n");
        if scored.is_empty() {
            out.push_str("No projects tracked yet.\n");
            return out;
        }

        let critical: Vec<_> = scored.iter().filter(|(_, h)| h.score < 40).collect();
        let attention: Vec<_> = scored.iter().filter(|(_, h)| (40..70).contains(&h.score)).collect();
        let healthy: Vec<_> = scored.iter().filter(|(_, h)| h.score >= 70).collect();

        if !critical.is_empty() {
            out.push_str("### 🚨 Critical (Needs Immediate Attention):\n");
            for (name, health) in critical {
                out.push_str(&format_health(name, health));
            }
        }

        if !attention.is_empty() {
            out.push_str("\n### ⚠️ Needs Attention:\n");
            for (name, health) in attention {
                out.push_str(&format_health(name, health));
            }
        }

        if !healthy.is_empty() {
            out.push_str("\n### ✅ Healthy Projects:\n");
            for (name, health) in healthy {
                let _ = writeln!(out, "- **{}** (Health: {}/100)", name, health.score);
            }
        }
        out
    }

    /// Factor breakdown for one project
    pub fn health_details(&self, name: &str, now: DateTime<Utc>) -> Option<String> {
        let record = self.projects.get(name)?;
        let health = Self::project_health(record, now);
        Some(format_health(name, &health))
    }
}

/// Copy canonical project fields over an analytics record, migrating when there is none
fn merge(record: Option<ProjectWithAnalytics>, project: &Project) -> ProjectWithAnalytics {
    match record {
        Some(mut record) => {
            record.project.description = project.description.clone();
            record.project.status = project.status.clone();
            record.project.notes = project.notes.clone();
            record.project.tech_stack = project.tech_stack.clone();
            record.project.last_modified = project.last_modified;
            record.project.current_tasks = project.current_tasks.clone();
            record
                .completed_tasks
                .retain(|t| !project.current_tasks.contains(t));
            record
        }
        None => ProjectWithAnalytics::migrate(project.clone()),
    }
}

fn heat_marker(score: u32) -> &'static str {
    match score {
        0 => "💤",
        1..=5 => "🔥",
        6..=15 => "🔥🔥",
        _ => "🔥🔥🔥",
    }
}

fn format_health(name: &str, health: &ProjectHealth) -> String {
    let mut out = format!("#### {} (Health: {}/100)\n", name, health.score);
    for factor in &health.factors {
        let marker = match factor.score {
            70.. => "✅",
            40..=69 => "⚠️",
            _ => "❌",
        };
        let _ = writeln!(
            out,
            "  - {} {}: {}/100 - {}",
            marker,
            factor.kind.label(),
            factor.score,
            factor.description
        );
    }
    if !health.recommendations.is_empty() {
        let _ = writeln!(out, "  - **Recommendations**: {}", health.recommendations.join(", "));
    }
    out.push('\n');
    out
}
