//! Property checks over randomly generated families, with spouses who married
//! in and couples standing on their own.

mod common;

use common::{date, married, person};
use legacytree_core::classify::classify;
use legacytree_core::collapse::prune;
use legacytree_core::hierarchy::Hierarchy;
use legacytree_core::layout::NodeKind;
use legacytree_core::mutation::add_person;
use legacytree_core::permission::can_mutate;
use legacytree_core::{
    render, Actor, ExpansionState, LayoutConfig, NewPerson, Person, RelationStore, RelationType,
    Scene, StructureError, TreeError, ValidationError,
};
use proptest::prelude::*;

fn id(i: usize) -> String {
    format!("n{i:02}")
}

/// Acyclic families: each person's parent, if any, comes earlier in the list.
fn forest() -> impl Strategy<Value = Vec<Person>> {
    prop::collection::vec(prop::option::weighted(0.75, any::<prop::sample::Index>()), 1..14).prop_map(
        |links| {
            links
                .iter()
                .enumerate()
                .map(|(i, link)| {
                    let mut p = person(&id(i));
                    if i > 0 {
                        p.parent_id = link.as_ref().map(|ix| id(ix.index(i)));
                    }
                    p
                })
                .collect()
        },
    )
}

/// A forest plus people without lineage of their own: spouses who married
/// into it (`sNN`) and unanchored couples standing apart (`cNNa` + `cNNb`).
/// Nobody is married twice.
fn family() -> impl Strategy<Value = Vec<Person>> {
    (forest(), prop::collection::vec(any::<prop::sample::Index>(), 0..6), 0usize..3).prop_map(
        |(mut people, partners, couples)| {
            let born = people.len();
            for (k, pick) in partners.iter().enumerate() {
                let partner = pick.index(born);
                if people[partner].spouse_id.is_some() {
                    continue;
                }
                let sid = format!("s{k:02}");
                people[partner].spouse_id = Some(sid.clone());
                let partner_id = people[partner].id.clone();
                people.push(married(person(&sid), &partner_id));
            }
            for k in 0..couples {
                let (a, b) = (format!("c{k:02}a"), format!("c{k:02}b"));
                people.push(married(person(&a), &b));
                people.push(married(person(&b), &a));
            }
            people
        },
    )
}

fn pick_id(people: &[&Person], pick: &prop::sample::Index) -> String {
    people[pick.index(people.len())].id.clone()
}

fn store_of(people: Vec<Person>) -> RelationStore {
    RelationStore::from_people(people).unwrap_or_else(|e| panic!("bad fixture: {e}"))
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn virtual_root_iff_several_roots(people in family()) {
        let store = store_of(people);
        let c = classify(&store);
        let roots = c.lineage.iter().filter(|p| p.parent_id.is_none()).count();
        let tree = Hierarchy::build(&store, &c).unwrap().unwrap();
        prop_assert_eq!(tree.has_virtual_root(), roots > 1);
        prop_assert_eq!(tree.real_roots().len(), roots);
        let virtual_nodes = tree.nodes().iter().filter(|n| n.anchor.is_virtual()).count();
        prop_assert!(virtual_nodes <= 1);
    }

    #[test]
    fn everyone_is_lineage_or_satellite_once(people in family()) {
        let store = store_of(people);
        let c = classify(&store);
        prop_assert_eq!(c.lineage.len() + c.spouses.len(), store.len());
        for s in &c.spouses {
            prop_assert!(!c.is_lineage(&s.id), "{} is in both lists", s.id);
            let partner = s.spouse_id.as_deref().unwrap_or_default();
            prop_assert!(c.is_lineage(partner), "{} hangs off a non-lineage partner", s.id);
        }
        for p in store.people().iter().filter(|p| p.id.starts_with('s') || p.id.ends_with('b')) {
            prop_assert!(!c.is_lineage(&p.id), "{} should be a satellite", p.id);
        }
    }

    #[test]
    fn unanchored_couple_picks_one_by_id(a in "[a-z]{1,6}", b in "[a-z]{1,6}") {
        prop_assume!(a != b);
        let forward = store_of(vec![married(person(&a), &b), married(person(&b), &a)]);
        let backward = store_of(vec![married(person(&b), &a), married(person(&a), &b)]);
        let pick = |store: &RelationStore| -> Vec<String> {
            classify(store).lineage.iter().map(|p| p.id.clone()).collect()
        };
        let expected = vec![a.clone().min(b.clone())];
        prop_assert_eq!(pick(&forward), expected.clone());
        prop_assert_eq!(pick(&backward), expected.clone());
        prop_assert_eq!(pick(&forward), pick(&forward));
    }

    #[test]
    fn collapse_then_expand_restores_shape(people in family(), pick in any::<prop::sample::Index>()) {
        let store = store_of(people);
        let c = classify(&store);
        let tree = Hierarchy::build(&store, &c).unwrap().unwrap();
        let mut state = ExpansionState::new();
        state.expand_all(&store);
        let original = prune(&tree, &state);

        let target = pick_id(&c.lineage, &pick);
        let mut pruned = original.clone();
        prop_assert!(pruned.collapse(&target));
        prop_assert!(pruned.expand(&target));
        prop_assert_eq!(pruned.shape(), original.shape());
    }

    #[test]
    fn spouse_add_is_symmetric(people in family(), pick in any::<prop::sample::Index>()) {
        let mut store = store_of(people);
        let single: Vec<&Person> = store.people().iter().filter(|p| p.spouse_id.is_none()).collect();
        prop_assume!(!single.is_empty());
        let target = pick_id(&single, &pick);
        let new_id = add_person(
            &mut store,
            NewPerson::named("Partner", date(1970, 1, 1)),
            RelationType::Spouse,
            Some(target.as_str()),
        )
        .unwrap();
        prop_assert_eq!(store.get(&new_id).unwrap().spouse_id.as_deref(), Some(target.as_str()));
        prop_assert_eq!(store.get(&target).unwrap().spouse_id.as_deref(), Some(new_id.as_str()));
        prop_assert!(store.integrity_issues().is_empty());
    }

    #[test]
    fn second_spouse_is_refused_untouched(people in family(), pick in any::<prop::sample::Index>()) {
        let mut store = store_of(people);
        let wed: Vec<&Person> = store.people().iter().filter(|p| p.spouse_id.is_some()).collect();
        prop_assume!(!wed.is_empty());
        let target = pick_id(&wed, &pick);
        let before = store.snapshot();
        let err = add_person(
            &mut store,
            NewPerson::named("Other", date(1971, 1, 1)),
            RelationType::Spouse,
            Some(target.as_str()),
        )
        .unwrap_err();
        prop_assert!(matches!(err, TreeError::Validation(ValidationError::AlreadyMarried(_))));
        prop_assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn branch_scope_follows_parent_paths(people in family(), b in any::<prop::sample::Index>(), t in any::<prop::sample::Index>()) {
        let store = store_of(people);
        let branch = store.people()[b.index(store.len())].id.clone();
        let target = store.people()[t.index(store.len())].id.clone();
        let descends = target == branch || store.ancestors(&target).iter().any(|p| p.id == branch);
        prop_assert_eq!(can_mutate(&Actor::branch_admin(&branch), Some(target.as_str()), &store), descends);
        prop_assert!(!can_mutate(&Actor::branch_admin(&branch), None, &store));
    }

    #[test]
    fn full_layout_is_stable_and_clear(people in family()) {
        let store = store_of(people);
        let config = LayoutConfig::default();
        let mut state = ExpansionState::new();
        state.expand_all(&store);
        let first = render(&store, &state, &config).unwrap();
        let second = render(&store, &state, &config).unwrap();
        prop_assert_eq!(&first, &second);
        let layout = match first {
            Scene::Drawn(layout) => layout,
            Scene::Empty => unreachable!("family is never empty"),
        };
        prop_assert_eq!(layout.nodes.len(), store.len());
        let satellites = layout.nodes.iter().filter(|n| n.kind == NodeKind::Spouse).count();
        prop_assert_eq!(satellites, classify(&store).spouses.len());
        for (i, a) in layout.nodes.iter().enumerate() {
            for b in &layout.nodes[i + 1..] {
                prop_assert!(
                    (a.x - b.x).abs() >= config.card_width || (a.y - b.y).abs() >= config.card_height,
                    "{} overlaps {}", a.id, b.id
                );
            }
        }
    }

    #[test]
    fn satellites_follow_partner_expansion(people in family(), open in prop::collection::vec(any::<prop::sample::Index>(), 0..8)) {
        let store = store_of(people);
        let c = classify(&store);
        let state = ExpansionState::seeded(open.iter().map(|ix| pick_id(&c.lineage, ix)));
        let scene = render(&store, &state, &LayoutConfig::default()).unwrap();
        let layout = scene.layout().unwrap();
        for n in &layout.nodes {
            match n.kind {
                NodeKind::Spouse => {
                    let partner = n.partner_id.as_deref().unwrap_or_default();
                    let anchor = layout.node(partner);
                    prop_assert!(anchor.is_some_and(|a| a.expanded), "{} shown beside a collapsed card", n.id);
                }
                NodeKind::Lineage => {
                    let satellite = c.attached_spouse(&n.id).filter(|_| n.expanded);
                    prop_assert_eq!(satellite.map(|s| s.id.as_str()), n.partner_id.as_deref());
                    if let Some(s) = satellite {
                        prop_assert!(layout.node(&s.id).is_some());
                    }
                }
            }
        }
        if state.is_empty() {
            prop_assert!(layout.nodes.iter().all(|n| n.kind == NodeKind::Lineage));
        }
    }

    #[test]
    fn parent_rings_fail_without_hanging(len in 2usize..8) {
        let people: Vec<Person> = (0..len)
            .map(|i| {
                let mut p = person(&id(i));
                p.parent_id = Some(id((i + 1) % len));
                p
            })
            .collect();
        let store = store_of(people);
        let c = classify(&store);
        let is_cycle = matches!(Hierarchy::build(&store, &c), Err(StructureError::Cycle { .. }));
        prop_assert!(is_cycle);
    }
}
