use super::*;
use crate::fixtures::{first_param, world};

// =============================================================================
// Classes, top and bottom
// =============================================================================

#[test]
fn test_bottom_and_top() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);
    let defn = w.defn();

    for tp in [w.dog_t, defn.int_type, w.list_of(w.dog_t), w.elem_of(w.o_ref)] {
        assert!(cmp.is_sub_type(defn.nothing_type, tp));
        assert!(cmp.is_sub_type(tp, defn.any_type));
    }
    assert!(!cmp.is_sub_type(defn.any_type, w.dog_t));
}

#[test]
fn test_class_inheritance() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);
    let defn = w.defn();

    assert!(cmp.is_sub_type(w.dog_t, w.animal_t));
    assert!(cmp.is_sub_type(w.dog_t, defn.object_type));
    assert!(!cmp.is_sub_type(w.animal_t, w.dog_t));
    assert!(!cmp.is_sub_type(w.dog_t, w.cat_t));
    assert!(cmp.is_sub_type(defn.int_type, w.number_t));
    assert!(!cmp.is_sub_type(defn.int_type, defn.object_type));
}

#[test]
fn test_null_conforms_to_reference_classes_only() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);
    let defn = w.defn();

    assert!(cmp.is_sub_type(defn.null_type, w.dog_t));
    assert!(cmp.is_sub_type(defn.null_type, defn.string_type));
    assert!(!cmp.is_sub_type(defn.null_type, defn.int_type));
    assert!(!cmp.is_sub_type(defn.null_type, defn.nothing_type));
}

#[test]
fn test_no_type_is_unrelated() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);
    let defn = w.defn();

    assert!(!cmp.is_sub_type(TypeId::NO_TYPE, defn.any_type));
    assert!(!cmp.is_sub_type(defn.nothing_type, TypeId::NO_TYPE));
    assert!(!cmp.is_sub_type(TypeId::NO_TYPE, TypeId::NO_TYPE));
    assert!(!cmp.is_same_type(TypeId::NO_TYPE, TypeId::NO_TYPE));
}

#[test]
fn test_wildcard_and_error_conform_both_ways() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);

    for special in [TypeId::WILDCARD, TypeId::ERROR] {
        assert!(cmp.is_sub_type(special, w.dog_t));
        assert!(cmp.is_sub_type(w.dog_t, special));
        assert!(cmp.is_sub_type(special, w.list_of(w.cat_t)));
    }
}

// =============================================================================
// Intersections and unions
// =============================================================================

#[test]
fn test_intersections() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let defn = w.defn();

    assert!(cmp.is_sub_type(w.dog_t, db.and(w.animal_t, defn.object_type)));
    assert!(!cmp.is_sub_type(w.dog_t, db.and(w.animal_t, w.cat_t)));
    assert!(cmp.is_sub_type(db.and(w.dog_t, w.cat_t), w.cat_t));
    assert!(cmp.is_sub_type(db.and(w.dog_t, w.cat_t), w.animal_t));
}

#[test]
fn test_unions() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);

    assert!(cmp.is_sub_type(w.dog_t, db.or(w.dog_t, w.cat_t)));
    assert!(cmp.is_sub_type(db.or(w.dog_t, w.cat_t), w.animal_t));
    assert!(!cmp.is_sub_type(db.or(w.dog_t, w.animal_t), w.dog_t));
    assert!(cmp.is_same_type(db.or(w.dog_t, w.cat_t), db.or(w.cat_t, w.dog_t)));
}

// =============================================================================
// Refinements
// =============================================================================

#[test]
fn test_refinements_of_type_parameters() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let defn = w.defn();

    assert!(cmp.is_sub_type(w.int_list_t, w.list_t));
    assert!(cmp.is_sub_type(w.int_list_t, w.list_of(defn.int_type)));
    assert!(!cmp.is_sub_type(w.int_list_t, w.list_of(defn.string_type)));
    assert!(cmp.is_sub_type(w.list_of(w.dog_t), w.list_t));
    assert!(!cmp.is_sub_type(w.list_t, w.list_of(w.dog_t)));

    let upper_animal = db.refined(w.list_t, w.list_a, db.upper_bounds(w.animal_t));
    assert!(cmp.is_sub_type(w.list_of(w.dog_t), upper_animal));
    assert!(!cmp.is_sub_type(upper_animal, w.list_of(w.dog_t)));
}

#[test]
fn test_wildcard_refinement_name_only_checks_parent() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let any_member = db.refined(w.list_t, db.intern_string("_"), db.alias_bounds(w.dog_t));

    assert!(cmp.is_sub_type(w.list_of(w.cat_t), any_member));
    assert!(!cmp.is_sub_type(w.dog_t, any_member));
}

// =============================================================================
// Abstract types, aliases and paths
// =============================================================================

#[test]
fn test_path_dependent_types() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);
    let o_elem = w.elem_of(w.o_ref);
    let p_elem = w.elem_of(w.p_ref);

    assert!(cmp.is_sub_type(o_elem, w.animal_t));
    assert!(cmp.is_sub_type(o_elem, o_elem));
    assert!(!cmp.is_sub_type(o_elem, p_elem));
    assert!(!cmp.is_sub_type(w.dog_t, o_elem));
}

#[test]
fn test_erased_types_ignore_prefixes() {
    let w = world();
    let options = ComparerOptions::default().with_erased_types(true);
    let cmp = TypeComparer::with_options(&w.db, options);

    assert!(cmp.is_sub_type(w.elem_of(w.o_ref), w.elem_of(w.p_ref)));
}

#[test]
fn test_lower_bounded_abstract_type() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let pack = db
        .declare_abstract_type(SymbolId::NONE, "Pack", db.bounds(w.dog_t, w.animal_t))
        .expect("type Pack >: Dog <: Animal");
    let pack_t = db.class_ref(pack);

    assert!(cmp.is_sub_type(w.dog_t, pack_t));
    assert!(cmp.is_sub_type(pack_t, w.animal_t));
    assert!(!cmp.is_sub_type(w.cat_t, pack_t));
    assert!(!cmp.is_sub_type(pack_t, w.dog_t));
}

#[test]
fn test_aliases_conform_both_ways() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let pet = db
        .declare_alias(SymbolId::NONE, "Pet", w.dog_t)
        .expect("alias Pet = Dog");
    let pet_t = db.class_ref(pet);

    assert!(cmp.is_sub_type(pet_t, w.animal_t));
    assert!(cmp.is_sub_type(w.dog_t, pet_t));
    assert!(cmp.is_same_type(pet_t, w.dog_t));
    assert!(cmp.is_sub_type(w.defn().null_type, pet_t));
}

// =============================================================================
// Singletons and markers
// =============================================================================

#[test]
fn test_singleton_marker() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let singleton = w.defn().singleton_type;

    assert!(cmp.is_sub_type(w.o_ref, singleton));
    assert!(cmp.is_sub_type(db.literal_int(3), singleton));
    assert!(!cmp.is_sub_type(w.dog_t, singleton));
}

#[test]
fn test_not_null_marker() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let defn = w.defn();

    assert!(cmp.is_sub_type(defn.int_type, defn.not_null_type));
    assert!(cmp.is_sub_type(db.literal_string("x"), defn.not_null_type));
    assert!(!cmp.is_sub_type(w.dog_t, defn.not_null_type));
}

#[test]
fn test_literals_widen_to_their_class() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let defn = w.defn();
    let three = db.literal_int(3);

    assert!(cmp.is_sub_type(three, defn.int_type));
    assert!(cmp.is_sub_type(three, w.number_t));
    assert!(!cmp.is_sub_type(three, defn.string_type));
    assert!(!cmp.is_sub_type(three, db.literal_int(4)));
    assert!(cmp.is_sub_type(db.literal_bool(false), defn.boolean_type));
}

#[test]
fn test_term_ref_widens_to_declared_type() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);

    assert!(cmp.is_sub_type(w.o_ref, w.outer_t));
    assert!(!cmp.is_sub_type(w.o_ref, w.p_ref));
    assert!(!cmp.is_sub_type(w.outer_t, w.o_ref));
}

// =============================================================================
// Methods, by-name, bounds and universals
// =============================================================================

#[test]
fn test_method_results_are_covariant() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let int = w.defn().int_type;

    let to_dog = db.simple_method(&[int], w.dog_t, MethodFlags::empty());
    let to_animal = db.simple_method(&[int], w.animal_t, MethodFlags::empty());
    assert!(cmp.is_sub_type(to_dog, to_animal));
    assert!(!cmp.is_sub_type(to_animal, to_dog));
}

#[test]
fn test_method_params_must_match() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let defn = w.defn();

    let plain = db.simple_method(&[defn.int_type], w.dog_t, MethodFlags::empty());
    let implicit = db.simple_method(&[defn.int_type], w.dog_t, MethodFlags::IMPLICIT);
    let by_string = db.simple_method(&[defn.string_type], w.dog_t, MethodFlags::empty());
    let nullary = db.simple_method(&[], w.dog_t, MethodFlags::empty());

    assert!(!cmp.is_sub_type(plain, implicit));
    assert!(!cmp.is_sub_type(plain, by_string));
    assert!(!cmp.is_sub_type(plain, nullary));
    assert!(!cmp.is_sub_type(w.dog_t, plain));
}

#[test]
fn test_dependent_method_results() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let (outer_t, elem) = (w.outer_t, w.outer_elem);
    let dependent = || {
        db.method(&["x"], MethodFlags::empty(), |db, params| {
            (vec![outer_t], db.type_ref(params[0], elem))
        })
        .expect("one formal per parameter")
    };
    let (m1, m2) = (dependent(), dependent());
    let widened = db.simple_method(&[outer_t], w.animal_t, MethodFlags::empty());

    assert_ne!(m1, m2);
    assert!(cmp.is_sub_type(m1, m2));
    assert!(cmp.is_sub_type(m1, widened));
    assert!(!cmp.is_sub_type(widened, m1));
}

#[test]
fn test_by_name_is_covariant() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);

    assert!(cmp.is_sub_type(db.by_name(w.dog_t), db.by_name(w.animal_t)));
    assert!(!cmp.is_sub_type(db.by_name(w.animal_t), db.by_name(w.dog_t)));
}

#[test]
fn test_bounds_nest() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);

    let upper_animal = db.upper_bounds(w.animal_t);
    assert!(cmp.is_sub_type(db.alias_bounds(w.dog_t), upper_animal));
    assert!(cmp.is_sub_type(db.bounds(w.animal_t, w.animal_t), db.bounds(w.dog_t, w.animal_t)));
    assert!(!cmp.is_sub_type(upper_animal, db.alias_bounds(w.dog_t)));
    assert!(cmp.is_sub_type(db.class_info(TypeId::NO_PREFIX, w.dog), upper_animal));
    assert!(!cmp.is_sub_type(
        db.class_info(TypeId::NO_PREFIX, w.dog),
        db.upper_bounds(w.cat_t)
    ));
}

#[test]
fn test_universals_compare_bounds_and_results() {
    let w = world();
    let cmp = TypeComparer::new(&w.db);

    let a1 = w.poly_upper(w.animal_t);
    let a2 = w.poly_upper(w.animal_t);
    let d = w.poly_upper(w.dog_t);
    assert_ne!(a1, a2);
    assert!(cmp.is_sub_type(a1, a2));
    assert!(!cmp.is_sub_type(a1, d));
    assert!(!cmp.is_sub_type(a1, w.animal_t));
}

// =============================================================================
// Type variables and speculation
// =============================================================================

#[test]
fn test_type_variable_conforms_through_instance() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);
    let int = w.defn().int_type;
    let poly = w.poly_upper(w.defn().any_type);
    let var = db
        .type_var(db.param_type(first_param(db, poly)))
        .expect("parameter origin");

    assert!(!cmp.is_sub_type(int, var));
    db.instantiate(var, w.number_t).expect("first instantiation");
    assert!(cmp.is_sub_type(int, var));
    assert!(cmp.is_sub_type(var, w.number_t));
    assert!(!cmp.is_sub_type(var, int));
}

#[test]
fn test_depth_returns_to_zero() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);

    assert!(cmp.is_sub_type(w.int_list_t, w.list_of(w.defn().int_type)));
    assert_eq!(cmp.recursion_depth(), 0);
    assert!(!cmp.is_sub_type(w.animal_t, db.or(w.dog_t, w.cat_t)));
    assert_eq!(cmp.recursion_depth(), 0);
    assert_eq!(cmp.monitored_crossings(), 0);
}

#[test]
fn test_is_same_type() {
    let w = world();
    let db = &w.db;
    let cmp = TypeComparer::new(db);

    assert!(cmp.is_same_type(w.dog_t, w.dog_t));
    assert!(!cmp.is_same_type(w.dog_t, w.animal_t));
    assert!(cmp.is_same_type(db.and(w.dog_t, w.cat_t), db.and(w.cat_t, w.dog_t)));
    assert!(cmp.is_same_type(db.upper_bounds(w.dog_t), db.upper_bounds(w.dog_t)));
}
