use cadence_core::{TemplateRef, WorkflowNode};

/// A `send_email` step resolved to its position in the delay accumulator
/// (§4.2 Step C).
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub node_id: String,
    pub template: TemplateRef,
    pub days_offset: i64,
}

/// Walk an automation's node list in order, skipping `entry_criteria` and
/// `trigger`, accumulating `delay` durations, and emitting one [`PlanStep`]
/// per `send_email`. `condition` nodes recurse into `branches_yes` only --
/// the `no` branch is left to runtime by design (§9).
#[must_use]
pub fn plan_steps(nodes: &[WorkflowNode]) -> Vec<PlanStep> {
    let mut steps = Vec::new();
    walk(nodes, 0, &mut steps);
    steps
}

fn walk(nodes: &[WorkflowNode], start_acc: i64, steps: &mut Vec<PlanStep>) -> i64 {
    let mut acc = start_acc;
    for node in nodes {
        match node {
            WorkflowNode::EntryCriteria { .. } | WorkflowNode::Trigger { .. } => {}
            WorkflowNode::Delay { duration, unit } => acc += unit.to_days(*duration),
            WorkflowNode::SendEmail { node_id, template } => steps.push(PlanStep {
                node_id: node_id.clone(),
                template: template.clone(),
                days_offset: acc,
            }),
            WorkflowNode::Condition { branches_yes, .. } => {
                acc = walk(branches_yes, acc, steps);
            }
        }
    }
    acc
}
