use std::fmt::Write;

use chrono::NaiveDate;

use crate::risk::MemberEvaluation;

/// Members ordered by burnout risk, highest first.
pub fn rank_by_risk(evaluations: &[MemberEvaluation]) -> Vec<&MemberEvaluation> {
    let mut ranked: Vec<&MemberEvaluation> = evaluations.iter().collect();
    ranked.sort_by(|a, b| {
        b.assessment
            .burnout_risk
            .cmp(&a.assessment.burnout_risk)
            .then_with(|| a.member_id.cmp(&b.member_id))
    });
    ranked
}

pub fn build_report(
    team: &str,
    generated_on: NaiveDate,
    evaluations: &[MemberEvaluation],
) -> String {
    let ranked = rank_by_risk(evaluations);
    let burnt_out: Vec<&&MemberEvaluation> =
        ranked.iter().filter(|e| e.assessment.is_burnt_out).collect();
    let helpers: Vec<&&MemberEvaluation> = ranked
        .iter()
        .filter(|e| e.assessment.is_eligible_helper)
        .collect();

    let mut output = String::new();

    let _ = writeln!(output, "# Team Wellbeing Report");
    let _ = writeln!(output, "Generated for team {} on {}", team, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Members evaluated: {}", evaluations.len());
    let _ = writeln!(output, "- Showing burnout signs: {}", burnt_out.len());
    let _ = writeln!(output, "- Available to help: {}", helpers.len());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Members by Burnout Risk");

    if ranked.is_empty() {
        let _ = writeln!(output, "No members on this team.");
    } else {
        for evaluation in ranked.iter() {
            let metrics = &evaluation.metrics;
            let _ = writeln!(
                output,
                "- {} ({}) risk {}%: wellbeing {}/100, stress {}, completion {}%, \
                 meetings {:.1}h, overtime {} this week [{}]",
                evaluation.member_name,
                evaluation.member_id,
                evaluation.assessment.burnout_risk,
                metrics.wellbeing_score,
                metrics.stress_level,
                metrics.task_completion_rate,
                metrics.meeting_hours,
                evaluation.weekly_overtime,
                evaluation.source
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if burnt_out.is_empty() {
        let _ = writeln!(output, "Nobody is showing burnout signs.");
    } else {
        for evaluation in burnt_out.iter() {
            let _ = writeln!(
                output,
                "- {}{}",
                evaluation.member_name,
                if evaluation.metrics.is_exhausted {
                    " (reported exhaustion)"
                } else {
                    ""
                }
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Possible Peer Helpers");

    if helpers.is_empty() {
        let _ = writeln!(output, "No members currently eligible to help.");
    } else {
        for evaluation in helpers.iter() {
            let _ = writeln!(
                output,
                "- {} (completion {}%)",
                evaluation.member_name, evaluation.metrics.task_completion_rate
            );
        }
    }

    output
}
