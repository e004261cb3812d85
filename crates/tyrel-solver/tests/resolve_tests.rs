use super::*;
use crate::comparer::{PendingPair, SubtypeFrame};
use crate::fixtures::{first_param, world};
use std::panic::{self, AssertUnwindSafe};

#[test]
fn test_track_seeds_declared_bounds() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = w.poly_upper(w.number_t);

    let tracked = cmp.track(poly).expect("universal type");
    assert_eq!(tracked, poly);
    let x = first_param(db, poly);
    assert_eq!(cmp.constraint().bounds_of(x), Some(db.upper_bounds(w.number_t)));
}

#[test]
fn test_track_twice_tracks_a_copy() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = w.f_bounded();

    let first = cmp.track(poly).expect("universal type");
    let second = cmp.track(poly).expect("universal type");
    assert_eq!(first, poly);
    assert_ne!(second, poly);

    let (b1, b2) = (
        db.binder_of(first).expect("binder"),
        db.binder_of(second).expect("binder"),
    );
    assert_ne!(b1, b2);
    let store = cmp.constraint();
    assert_eq!(store.len(), 2);
    // The copy's bound refers to the copy's own parameter.
    let copied = store.bounds_of(ParamRef::new(b2, 0)).expect("tracked copy");
    assert!(db.mentions_param(copied, ParamRef::new(b2, 0)));
    assert!(!db.mentions_param(copied, ParamRef::new(b1, 0)));
}

#[test]
fn test_track_rejects_non_universal() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);

    assert_eq!(
        cmp.track(w.dog_t),
        Err(TypeAlgebraError::NotUniversal(w.dog_t))
    );
    assert!(cmp.constraint().is_empty());
}

#[test]
fn test_lower_bound_narrowed_by_comparison() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp.track(w.poly_upper(w.number_t)).expect("universal type");
    let x_ref = first_param(db, poly);
    let x = db.param_type(x_ref);
    let five = db.literal_int(5);

    assert!(cmp.is_sub_type(five, x));
    assert_eq!(
        cmp.constraint().bounds_of(x_ref),
        Some(db.bounds(five, w.number_t))
    );
}

#[test]
fn test_failed_comparison_rolls_back_constraints() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp.track(w.poly_upper(w.number_t)).expect("universal type");
    let x = db.param_type(first_param(db, poly));
    assert!(cmp.is_sub_type(db.literal_int(5), x));

    let before = cmp.constraint();
    assert!(!cmp.is_sub_type(x, w.dog_t));
    assert!(cmp.constraint().ptr_eq(&before));
    assert!(!cmp.is_sub_type(db.literal_string("five"), x));
    assert!(cmp.constraint().ptr_eq(&before));
}

#[test]
fn test_failed_same_type_rolls_back_constraints() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp.track(w.poly_upper(w.animal_t)).expect("universal type");
    let x = db.param_type(first_param(db, poly));
    let before = cmp.constraint();

    // Dog <: X | Cat narrows X from below; X | Cat <: Dog then fails.
    assert!(!cmp.is_same_type(w.dog_t, db.or(x, w.cat_t)));
    assert!(cmp.constraint().ptr_eq(&before));

    let getter = db.simple_method(&[], w.dog_t, MethodFlags::empty());
    let widened = db.simple_method(&[], db.or(x, w.cat_t), MethodFlags::empty());
    assert!(!cmp.matches_type(getter, widened, false));
    assert!(cmp.constraint().ptr_eq(&before));
}

#[test]
fn test_panicking_comparison_restores_state() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp.track(w.poly_upper(w.animal_t)).expect("universal type");
    let x_ref = first_param(db, poly);
    let before = cmp.constraint();
    let pair = (w.dog_t, w.cat_t);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _frame = SubtypeFrame::enter(&cmp);
        let _pending = PendingPair::enter(&cmp, pair).expect("pair not in flight");
        assert!(cmp.add_constraint(x_ref, db.lower_bounds(w.dog_t)));
        assert!(!cmp.constraint().ptr_eq(&before));
        assert_eq!(cmp.recursion_depth(), 1);
        panic!("comparison aborted");
    }));

    assert!(outcome.is_err());
    assert!(cmp.constraint().ptr_eq(&before));
    assert_eq!(cmp.recursion_depth(), 0);
    let reentered = PendingPair::enter(&cmp, pair);
    assert!(reentered.is_some());
    drop(reentered);
    assert!(cmp.is_sub_type(w.dog_t, db.param_type(x_ref)));
}

#[test]
fn test_upper_bound_narrowed_by_comparison() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp
        .track(w.poly_upper(w.defn().any_type))
        .expect("universal type");
    let x_ref = first_param(db, poly);
    let x = db.param_type(x_ref);

    assert!(cmp.is_sub_type(x, w.animal_t));
    assert!(cmp.is_sub_type(w.dog_t, x));
    assert_eq!(
        cmp.constraint().bounds_of(x_ref),
        Some(db.bounds(w.dog_t, w.animal_t))
    );
    assert!(!cmp.is_sub_type(w.defn().int_type, x));
}

#[test]
fn test_add_constraint_reports_satisfiability() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp.track(w.poly_upper(w.animal_t)).expect("universal type");
    let x_ref = first_param(db, poly);

    assert!(cmp.add_constraint(x_ref, db.lower_bounds(w.dog_t)));
    // Narrowing is kept even when the result is unsatisfiable.
    assert!(!cmp.add_constraint(x_ref, db.upper_bounds(w.cat_t)));
    assert_eq!(
        cmp.constraint().bounds_of(x_ref),
        Some(db.bounds(w.dog_t, db.and(w.animal_t, w.cat_t)))
    );
}

#[test]
fn test_add_constraint_on_untracked_param() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let x_ref = first_param(db, w.poly_upper(w.animal_t));

    assert!(!cmp.add_constraint(x_ref, db.lower_bounds(w.dog_t)));
    assert!(cmp.constraint().is_empty());
}

#[test]
fn test_approximate_f_bounded_param() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp.track(w.f_bounded()).expect("universal type");
    let x_ref = first_param(db, poly);

    assert_eq!(cmp.approximate(x_ref, false), w.comparable_t);
    assert!(cmp.constraint().is_empty());
}

#[test]
fn test_approximate_from_below() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let poly = cmp.track(w.poly_upper(w.number_t)).expect("universal type");
    let x_ref = first_param(db, poly);
    let five = db.literal_int(5);
    assert!(cmp.is_sub_type(five, db.param_type(x_ref)));

    assert_eq!(cmp.approximate(x_ref, true), five);
    assert!(!cmp.constraint().is_constrained(x_ref));
}

#[test]
fn test_approximate_untracked_param() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let x_ref = first_param(db, w.poly_upper(w.animal_t));

    assert_eq!(cmp.approximate(x_ref, false), TypeId::NO_TYPE);
}

#[test]
fn test_replace_substitutes_into_other_bounds() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let int = w.defn().int_type;
    let poly = db
        .universal(&["X", "Y"], |db, params| {
            (vec![db.unbounded(), db.upper_bounds(params[0])], params[1])
        })
        .expect("two bounds for two parameters");
    let poly = cmp.track(poly).expect("universal type");
    let binder = db.binder_of(poly).expect("binder");
    let (x, y) = (ParamRef::new(binder, 0), ParamRef::new(binder, 1));

    let store = cmp.replace(x, int);
    assert!(store.ptr_eq(&cmp.constraint()));
    assert!(!store.is_constrained(x));
    assert_eq!(store.bounds_of(y), Some(db.upper_bounds(int)));

    let rest: Vec<ParamRef> = store.domain().collect();
    assert_eq!(rest, vec![y]);
}
