//! Node group algebra: `sample`, `except` and `join`

use crate::action::{decode, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::{ExceptParams, JoinParams, SampleParams};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Shuffle `group` and carve one disjoint slice per ratio
///
/// Slice `i` holds `round(ratios[i] * n)` members, capped by what is left.
pub fn carve<R: Rng + ?Sized>(group: &[String], ratios: &[f64], rng: &mut R) -> Vec<Vec<String>> {
    let mut shuffled = group.to_vec();
    shuffled.shuffle(rng);

    let total = shuffled.len();
    let mut rest = shuffled.into_iter();
    ratios
        .iter()
        .map(|ratio| {
            let want = (ratio.clamp(0.0, 1.0) * total as f64).round() as usize;
            rest.by_ref().take(want).collect()
        })
        .collect()
}

pub struct SampleAction;

#[async_trait]
impl Action for SampleAction {
    fn name(&self) -> &'static str {
        "sample"
    }

    async fn run(&self, _ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError> {
        let params: SampleParams = decode(params)?;
        let groups = carve(&params.group, &params.ratios, &mut rand::thread_rng());
        for (i, group) in groups.iter().enumerate() {
            let name = format!("group{}", i + 1);
            debug!("Sampled {} of {} into {}", group.len(), params.group.len(), name);
            // Later steps reference every group, including ones that rounded to nothing
            output.declare_multi(&name)?;
            output.emit_all(&name, group.iter(), false)?;
        }
        Ok(())
    }
}

pub struct ExceptAction;

#[async_trait]
impl Action for ExceptAction {
    fn name(&self) -> &'static str {
        "except"
    }

    async fn run(&self, _ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError> {
        let params: ExceptParams = decode(params)?;
        let excluded: HashSet<&String> = params.except.iter().collect();
        let remaining = params.group.iter().filter(|member| !excluded.contains(member));
        output.emit_all("group", remaining, false)?;
        Ok(())
    }
}

pub struct JoinAction;

#[async_trait]
impl Action for JoinAction {
    fn name(&self) -> &'static str {
        "join"
    }

    async fn run(&self, _ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError> {
        let params: JoinParams = decode(params)?;
        let mut seen = HashSet::new();
        let union = params
            .group1
            .iter()
            .chain(params.group2.iter())
            .filter(|member| seen.insert(*member));
        output.emit_all("group", union, false)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{context, output, values, FakeNode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::sync::Arc;

    fn nodes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("n{}", i)).collect()
    }

    #[test]
    fn test_carve_disjoint_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        let groups = carve(&nodes(10), &[0.3, 0.5], &mut rng);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1].len(), 5);
        let all: HashSet<_> = groups.iter().flatten().collect();
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_carve_caps_at_remaining() {
        let mut rng = StdRng::seed_from_u64(1);
        let groups = carve(&nodes(4), &[0.75, 0.75], &mut rng);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1].len(), 1);
    }

    #[tokio::test]
    async fn test_sample_emits_numbered_groups() {
        let ctx = context(Arc::new(FakeNode::default()));
        let (out, cache, _) = output(4);
        SampleAction
            .run(&ctx, json!({"group": nodes(4), "ratios": [0.5, 0.5]}), &out)
            .await
            .unwrap();
        assert_eq!(values(&cache, 4, "group1").len(), 2);
        assert_eq!(values(&cache, 4, "group2").len(), 2);
    }

    #[tokio::test]
    async fn test_sample_keeps_groups_that_round_to_nothing() {
        let ctx = context(Arc::new(FakeNode::default()));
        let (out, cache, _) = output(7);
        SampleAction
            .run(&ctx, json!({"group": nodes(5), "ratios": [0.02, 0.18]}), &out)
            .await
            .unwrap();

        let clean = cache.get(7, "group1").unwrap();
        assert!(clean.multi);
        assert!(clean.values.is_empty());
        assert_eq!(values(&cache, 7, "group2").len(), 1);

        let payload = json!({
            "nodes": netdrill_core::Reference::output(-1, "group1").to_value(),
            "clean": true,
        });
        let resolved = crate::resolve::resolve(&cache, 8, &payload).unwrap();
        assert_eq!(resolved["nodes"], json!([]));
    }

    #[tokio::test]
    async fn test_except_keeps_order() {
        let ctx = context(Arc::new(FakeNode::default()));
        let (out, cache, _) = output(2);
        ExceptAction
            .run(
                &ctx,
                json!({"group": ["a", "b", "c", "d"], "except": ["c", "a", "x"]}),
                &out,
            )
            .await
            .unwrap();
        assert_eq!(values(&cache, 2, "group"), vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_join_deduplicates() {
        let ctx = context(Arc::new(FakeNode::default()));
        let (out, cache, _) = output(3);
        JoinAction
            .run(&ctx, json!({"group1": ["a", "b"], "group2": ["b", "c"]}), &out)
            .await
            .unwrap();
        assert_eq!(values(&cache, 3, "group"), vec!["a", "b", "c"]);
    }
}
