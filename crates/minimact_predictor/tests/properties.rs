//! Property tests for the predictor

use minimact_predictor::*;
use minimact_reconciler::reconcile;
use minimact_vdom::{HexPath, VElement, VNode};
use proptest::prelude::*;

fn view(labels: &[String]) -> VNode {
    let root = HexPath::root().child(0);
    let children = labels
        .iter()
        .enumerate()
        .map(|(i, label)| VNode::text(label.clone(), root.child(i)));
    VElement::new("div", root.clone()).with_children(children).into()
}

fn labels() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c]{1,2}", 0..5)
}

fn policy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![
        Just(EvictionPolicy::LeastRecentlyUsed),
        Just(EvictionPolicy::LeastFrequentlyUsed),
        Just(EvictionPolicy::OldestFirst),
    ]
}

fn change() -> impl Strategy<Value = StateChange> {
    prop::collection::btree_set("[a-e]", 1..4).prop_map(|keys| {
        keys.into_iter()
            .fold(StateChange::new(), |change, key| change.with(key, 0, 1))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn predict_after_learn_returns_reconcile_output(
        change in change(),
        a in labels(),
        b in labels(),
    ) {
        let predictor = Predictor::new();
        let (old, new) = (view(&a), view(&b));
        predictor.learn(&change, &old, &new);

        let prediction = predictor.predict(&change, &old);
        prop_assert!(prediction.is_some());
        let prediction = prediction.unwrap();
        prop_assert_eq!(prediction.patches, reconcile(&old, &new).unwrap());
        prop_assert!(prediction.confidence > PredictorConfig::default().min_confidence);
    }

    #[test]
    fn per_key_cap_is_never_exceeded(
        cap in 1usize..6,
        extras in prop::collection::vec("[a-z]{1,3}", 1..30),
    ) {
        let predictor = Predictor::with_config(PredictorConfig::with_limits(0.5, cap)).unwrap();
        let (old, new) = (view(&[]), view(&["x".to_string()]));
        for extra in &extras {
            let change = StateChange::new().with("hot", 0, 1).with(format!("e_{}", extra), 0, 1);
            predictor.learn(&change, &old, &new);
            prop_assert!(predictor.patterns_for_key("hot") <= cap);
        }
    }

    #[test]
    fn state_key_cap_is_never_exceeded(
        cap in 1usize..6,
        policy in policy(),
        changes in prop::collection::vec(prop::collection::btree_set("[a-j]", 1..4), 1..30),
    ) {
        let predictor = Predictor::with_config(PredictorConfig {
            max_state_keys: cap,
            eviction_policy: policy,
            ..Default::default()
        })
        .unwrap();
        let (old, new) = (view(&[]), view(&["x".to_string()]));
        for keys in changes {
            let width = keys.len();
            let change = keys
                .into_iter()
                .fold(StateChange::new(), |change, key| change.with(key, 0, 1));
            predictor.learn(&change, &old, &new);
            let stats = predictor.stats();
            prop_assert!(stats.state_keys <= cap);
            if width <= cap {
                prop_assert!(predictor.predict(&change, &old).is_some());
            }
        }
    }

    #[test]
    fn memory_budget_is_never_exceeded(
        budget in 256usize..4096,
        policy in policy(),
        steps in prop::collection::vec((change(), labels()), 1..30),
    ) {
        let predictor = Predictor::with_config(PredictorConfig {
            max_memory_bytes: budget,
            eviction_policy: policy,
            ..Default::default()
        })
        .unwrap();
        let old = view(&[]);
        for (change, labels) in steps {
            predictor.learn(&change, &old, &view(&labels));
            let stats = predictor.stats();
            prop_assert!(stats.memory_bytes <= budget);
        }
    }

    #[test]
    fn confidence_recovers_monotonically(
        reinforcements in 0usize..5,
        recovery in 1usize..20,
    ) {
        let predictor = Predictor::new();
        let change = StateChange::new().with("n", 0, 1);
        let shape = change.shape(false);
        let (a, b, c) = (
            view(&["a".to_string()]),
            view(&["b".to_string()]),
            view(&["c".to_string()]),
        );

        predictor.learn(&change, &a, &b);
        for _ in 0..reinforcements {
            predictor.learn(&change, &a, &b);
        }
        // An outlier lowers confidence without zeroing it.
        let before = predictor.pattern(&shape).unwrap().confidence;
        prop_assert_eq!(predictor.learn(&change, &a, &c), LearnOutcome::Revised);
        let mut last = predictor.pattern(&shape).unwrap().confidence;
        prop_assert!(last < before);
        prop_assert!(last > 0.0);

        let ceiling = PredictorConfig::default().max_confidence;
        for _ in 0..recovery {
            prop_assert_eq!(predictor.learn(&change, &a, &c), LearnOutcome::Reinforced);
            let now = predictor.pattern(&shape).unwrap().confidence;
            prop_assert!(now > last);
            prop_assert!(now <= ceiling);
            last = now;
        }
    }

    #[test]
    fn save_load_preserves_predictions(
        observations in prop::collection::vec((change(), labels(), labels()), 1..8),
    ) {
        let predictor = Predictor::new();
        for (change, a, b) in &observations {
            predictor.learn(change, &view(a), &view(b));
        }
        let loaded = Predictor::load_from_json(&predictor.save_to_json().unwrap()).unwrap();
        for (change, a, _) in &observations {
            let current = view(a);
            prop_assert_eq!(loaded.predict(change, &current), predictor.predict(change, &current));
        }
    }
}
