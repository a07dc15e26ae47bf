//! Property-based tests for grouping, sampling, naming and coalesce.

#![allow(clippy::unwrap_used, clippy::cast_possible_wrap)]

use proptest::prelude::*;
use wrangle::{
    coalesce, coalesce::first_present, cross_names, make_unique, peel_last, sample_n,
    CoalesceOptions, Error, Frame, Record, SampleOptions, SampleSize, Table, VarLabel, Vector,
};

fn optional_ints(len: usize) -> impl Strategy<Value = Vec<Option<i64>>> {
    prop::collection::vec(prop::option::of(-50_i64..50), len)
}

fn keyed_table(keys: Vec<u8>) -> Table {
    let ids: Vec<i64> = (0..keys.len() as i64).collect();
    let keys: Vec<String> = keys.iter().map(|k| format!("k{k}")).collect();
    Table::new(vec![("key", Vector::from(keys)), ("id", Vector::from(ids))]).unwrap()
}

proptest! {
    #[test]
    fn prop_coalesce_single_input_is_identity(x in prop::collection::vec(prop::option::of(-50_i64..50), 0..30)) {
        let v = Vector::from(x);
        let out = coalesce([Some(&v)], &CoalesceOptions::new()).unwrap();
        prop_assert_eq!(out, v);
    }

    #[test]
    fn prop_coalesce_picks_first_present(
        (x, y) in (0_usize..30).prop_flat_map(|n| (optional_ints(n), optional_ints(n)))
    ) {
        let vx = Vector::from(x.clone());
        let vy = Vector::from(y.clone());
        let out = coalesce([Some(&vx), None, Some(&vy)], &CoalesceOptions::new()).unwrap();
        let expected: Vec<Option<i64>> = x.iter().zip(&y).map(|(a, b)| a.or(*b)).collect();
        prop_assert_eq!(out, Vector::from(expected));
    }

    #[test]
    fn prop_coalesce_is_idempotent(
        (x, y) in (0_usize..30).prop_flat_map(|n| (optional_ints(n), optional_ints(n)))
    ) {
        let vx = Vector::from(x);
        let vy = Vector::from(y);
        let options = CoalesceOptions::new();
        let once = coalesce([Some(&vx), Some(&vy)], &options).unwrap();
        let twice = coalesce([Some(&once), Some(&vy)], &options).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_coalesce_recycles_scalar_fallback(x in prop::collection::vec(prop::option::of(-50_i64..50), 1..30), fill in -50_i64..50) {
        let vx = Vector::from(x.clone());
        let scalar = Vector::from(vec![fill]);
        let out = coalesce([Some(&vx), Some(&scalar)], &CoalesceOptions::new()).unwrap();
        let expected: Vec<Option<i64>> = x.iter().map(|a| Some(a.unwrap_or(fill))).collect();
        prop_assert_eq!(out, Vector::from(expected));
    }

    #[test]
    fn prop_coalesce_never_splits_record_rows(
        rows in prop::collection::vec(prop::collection::vec(prop::option::of(-5.0_f64..5.0), 2), 1..10),
        fallback in prop::collection::vec(prop::collection::vec(prop::option::of(-5.0_f64..5.0), 2), 1..10),
    ) {
        let n = rows.len().min(fallback.len());
        let x = Vector::Record(Record::matrix(&rows[..n]).unwrap());
        let y = Vector::Record(Record::matrix(&fallback[..n]).unwrap());
        let out = coalesce([Some(&x), Some(&y)], &CoalesceOptions::new()).unwrap();
        let sources = first_present(&[x, y], n);
        let record = out.as_record().unwrap();
        for (i, source) in sources.iter().enumerate() {
            let expected = match source {
                Some(0) => rows[i].clone(),
                Some(_) => fallback[i].clone(),
                None => vec![None, None],
            };
            let actual: Vec<Option<f64>> = record
                .fields()
                .iter()
                .map(|f| f.to_f64().unwrap()[i])
                .collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn prop_groups_partition_rows(keys in prop::collection::vec(0_u8..5, 0..40)) {
        let n = keys.len();
        let frame = Frame::new(keyed_table(keys)).group_by(&["key"]).unwrap();
        let mut seen: Vec<usize> = frame.group_rows().iter().flatten().copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        prop_assert_eq!(frame.group_indices().len(), n);
        prop_assert!(frame.group_rows().iter().all(|rows| !rows.is_empty()));
    }

    #[test]
    fn prop_grouped_sample_structure(keys in prop::collection::vec(0_u8..4, 1..40), k in 0_usize..3, seed in any::<u64>()) {
        let frame = Frame::new(keyed_table(keys)).group_by(&["key"]).unwrap();
        let smallest = frame.group_size().into_iter().min().unwrap_or(0);
        prop_assume!(k <= smallest);
        let options = SampleOptions::new().with_seed(seed);
        let out = sample_n(&frame, SampleSize::Count(k), &options).unwrap();
        prop_assert_eq!(out.num_rows(), k * frame.n_groups());
        prop_assert_eq!(out.group_vars(), frame.group_vars());
        if k > 0 {
            prop_assert_eq!(out.n_groups(), frame.n_groups());
            prop_assert!(out.group_size().iter().all(|s| *s == k));
        }
    }

    #[test]
    fn prop_oversampling_without_replacement_fails(keys in prop::collection::vec(0_u8..4, 1..20)) {
        let frame = Frame::new(keyed_table(keys)).group_by(&["key"]).unwrap();
        let largest = frame.group_size().into_iter().max().unwrap_or(0);
        let result = sample_n(&frame, SampleSize::Count(largest + 1), &SampleOptions::new());
        let is_insufficient = matches!(result, Err(Error::InsufficientRows { .. }));
        prop_assert!(is_insufficient);

        let replaced = sample_n(
            &frame,
            SampleSize::Count(largest + 1),
            &SampleOptions::new().with_replace(true).with_seed(0),
        )
        .unwrap();
        prop_assert_eq!(replaced.num_rows(), (largest + 1) * frame.n_groups());
    }

    #[test]
    fn prop_cross_names_are_var_major(m in 2_usize..5, k in 2_usize..5) {
        let vars: Vec<VarLabel> = (0..m).map(|i| VarLabel::new(format!("v{i}"))).collect();
        let funs: Vec<Option<String>> = (0..k).map(|j| Some(format!("f{j}"))).collect();
        let names = cross_names(&vars, &funs);
        prop_assert_eq!(names.len(), m * k);
        for (idx, name) in names.iter().enumerate() {
            prop_assert_eq!(name, &format!("v{}_f{}", idx / k, idx % k));
        }
    }

    #[test]
    fn prop_make_unique_yields_distinct_names(names in prop::collection::vec("[ab]{1,2}", 0..12)) {
        let out = make_unique(names.clone());
        prop_assert_eq!(out.len(), names.len());
        let mut sorted = out.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(sorted.len(), out.len());
    }

    #[test]
    fn prop_peel_last_drops_one_level(vars in prop::collection::vec("[a-z]{1,3}", 0..5)) {
        let peeled = peel_last(&vars);
        prop_assert_eq!(peeled.len(), vars.len().saturating_sub(1));
        prop_assert!(vars.starts_with(&peeled));
    }
}
