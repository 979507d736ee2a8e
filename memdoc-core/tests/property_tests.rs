// Property-based tests using proptest
use memdoc_core::{apply_update, matches, Collection, Document, FindOptions};
use proptest::prelude::*;
use serde_json::{json, Value};

fn doc(value: Value) -> Document {
    Document::from_value(value).unwrap()
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,20}".prop_map(|s| json!(s)),
        any::<bool>().prop_map(|b| json!(b)),
        Just(Value::Null),
    ]
}

// ========== PROPERTY 1: Equality ==========

proptest! {
    #[test]
    fn prop_equality_is_reflexive(value in scalar()) {
        let d = doc(json!({"field": value.clone()}));

        // Invariant: a document matches its own field value
        let matches_plain = matches(&d, &json!({"field": value.clone()})).unwrap();
        prop_assert!(matches_plain);
        let matches_eq = matches(&d, &json!({"field": {"$eq": value}})).unwrap();
        prop_assert!(matches_eq);
    }
}

proptest! {
    #[test]
    fn prop_equality_is_symmetric(a in scalar(), b in scalar()) {
        let doc_a = doc(json!({"field": a.clone()}));
        let doc_b = doc(json!({"field": b.clone()}));

        let a_matches_b = matches(&doc_a, &json!({"field": {"$eq": b}})).unwrap();
        let b_matches_a = matches(&doc_b, &json!({"field": {"$eq": a}})).unwrap();

        prop_assert_eq!(a_matches_b, b_matches_a);
    }
}

// ========== PROPERTY 2: Empty Filter ==========

proptest! {
    #[test]
    fn prop_empty_filter_matches_everything(
        name in "[a-z]{1,20}",
        age in 0i64..150,
        tags in prop::collection::vec("[a-z]{1,8}", 0..5),
    ) {
        let d = doc(json!({"name": name, "age": age, "tags": tags}));

        let matches_empty = matches(&d, &json!({})).unwrap();
        prop_assert!(matches_empty);
    }
}

// ========== PROPERTY 3: Logical Combinators ==========

proptest! {
    #[test]
    fn prop_and_or_follow_their_branches(
        n in -1000i64..1000,
        low in -1000i64..1000,
        high in -1000i64..1000,
    ) {
        let d = doc(json!({"n": n}));
        let left = json!({"n": {"$gt": low}});
        let right = json!({"n": {"$lt": high}});

        let a = matches(&d, &left).unwrap();
        let b = matches(&d, &right).unwrap();

        let and = json!({"$and": [left.clone(), right.clone()]});
        let or = json!({"$or": [left.clone(), right.clone()]});
        let nor = json!({"$nor": [left, right]});

        prop_assert_eq!(matches(&d, &and).unwrap(), a && b);
        prop_assert_eq!(matches(&d, &or).unwrap(), a || b);
        prop_assert_eq!(matches(&d, &nor).unwrap(), !(a || b));
    }
}

// ========== PROPERTY 4: Set Membership ==========

proptest! {
    #[test]
    fn prop_in_and_nin_are_complementary(
        value in scalar(),
        set in prop::collection::vec(scalar(), 0..6),
    ) {
        let d = doc(json!({"field": value}));

        let is_in = matches(&d, &json!({"field": {"$in": set.clone()}})).unwrap();
        let not_in = matches(&d, &json!({"field": {"$nin": set}})).unwrap();

        // Invariant: for a present scalar exactly one holds
        prop_assert_ne!(is_in, not_in);
    }
}

// ========== PROPERTY 5: Numeric Comparison ==========

proptest! {
    #[test]
    fn prop_gt_and_lte_partition_numbers(value in -1.0e6f64..1.0e6, threshold in -1.0e6f64..1.0e6) {
        let d = doc(json!({"hours": value}));

        let gt = matches(&d, &json!({"hours": {"$gt": threshold}})).unwrap();
        let lte = matches(&d, &json!({"hours": {"$lte": threshold}})).unwrap();

        prop_assert_ne!(gt, lte);
        prop_assert_eq!(gt, value > threshold);
    }
}

// ========== PROPERTY 6: Update Operators ==========

proptest! {
    #[test]
    fn prop_push_then_pull_restores_array(
        tags in prop::collection::vec("[a-m]{1,5}", 0..6),
        extra in "[n-z]{1,5}",
    ) {
        let mut d = doc(json!({"tags": tags.clone()}));

        apply_update(&mut d, &json!({"$push": {"tags": extra.clone()}})).unwrap();
        let pushed = d.get("tags").and_then(Value::as_array).map(Vec::len);
        prop_assert_eq!(pushed, Some(tags.len() + 1));

        apply_update(&mut d, &json!({"$pull": {"tags": extra}})).unwrap();
        prop_assert_eq!(d.get("tags"), Some(&json!(tags)));
    }
}

proptest! {
    #[test]
    fn prop_inc_accumulates(
        start in -100000i64..100000,
        deltas in prop::collection::vec(-1000i64..1000, 1..10),
    ) {
        let mut d = doc(json!({"count": start}));

        for delta in &deltas {
            apply_update(&mut d, &json!({"$inc": {"count": delta}})).unwrap();
        }

        let expected: i64 = start + deltas.iter().sum::<i64>();
        prop_assert_eq!(d.get("count"), Some(&json!(expected)));
    }
}

proptest! {
    #[test]
    fn prop_updated_at_strictly_increases(rounds in 1usize..20) {
        let mut tasks = Collection::new("tasks");
        tasks.insert_one(json!({"_id": "t", "n": 0})).unwrap();

        let stamp = |tasks: &Collection| {
            tasks.documents()[0].get("updatedAt").and_then(Value::as_str).unwrap().to_string()
        };

        let mut previous = stamp(&tasks);
        for _ in 0..rounds {
            tasks.update_many(&json!({"_id": "t"}), &json!({"$inc": {"n": 1}})).unwrap();
            let current = stamp(&tasks);
            prop_assert!(current > previous);
            previous = current;
        }
    }
}

// ========== PROPERTY 7: Find Limit ==========

proptest! {
    #[test]
    fn prop_returned_count_respects_limit(
        values in prop::collection::vec(0i64..10, 0..40),
        threshold in 0i64..10,
        limit in -5i64..50,
    ) {
        let mut items = Collection::new("items");
        items.insert_many(values.iter().map(|v| json!({"v": v})).collect()).unwrap();

        let filter = json!({"v": {"$gte": threshold}});
        let options = FindOptions::new().with_limit(limit);
        let result = items.find(&filter, &json!({}), &options).unwrap();

        let expected_matched = values.iter().filter(|v| **v >= threshold).count();
        prop_assert_eq!(result.matched_count, expected_matched);
        prop_assert_eq!(result.returned_count, expected_matched.min(limit.max(1) as usize));
        prop_assert_eq!(result.docs.len(), result.returned_count);
    }
}

// ========== PROPERTY 8: Stable Sort ==========

proptest! {
    #[test]
    fn prop_sort_is_stable(
        keys in prop::collection::vec(0i64..4, 0..30),
        ascending in any::<bool>(),
    ) {
        let mut items = Collection::new("items");
        let docs = keys.iter().enumerate().map(|(seq, k)| json!({"k": k, "seq": seq})).collect();
        items.insert_many(docs).unwrap();

        let dir = if ascending { 1 } else { -1 };
        let options = FindOptions::new().with_sort("k", dir).with_limit(1000);
        let result = items.find(&json!({}), &json!({"k": 1, "seq": 1}), &options).unwrap();

        let sorted: Vec<(i64, i64)> = result
            .docs
            .iter()
            .map(|d| {
                let k = d.get("k").and_then(Value::as_i64).unwrap();
                let seq = d.get("seq").and_then(Value::as_i64).unwrap();
                (k, seq)
            })
            .collect();

        for pair in sorted.windows(2) {
            let ((k1, seq1), (k2, seq2)) = (pair[0], pair[1]);
            if ascending {
                prop_assert!(k1 <= k2);
            } else {
                prop_assert!(k1 >= k2);
            }
            // Invariant: ties keep insertion order
            if k1 == k2 {
                prop_assert!(seq1 < seq2);
            }
        }
    }
}
