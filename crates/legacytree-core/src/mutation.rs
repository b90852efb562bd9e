//! Adding people to the store.
//!
//! Every check runs before the first write, so a rejected add leaves the store
//! exactly as it was. Links are only ever set, never removed: the new person's
//! own links, plus the reciprocal link on the target (spouse) or the adopted
//! children (parent).

use crate::classify::classify;
use crate::error::{TreeError, ValidationError};
use crate::model::{Actor, NewPerson, Person, RelationType, DEFAULT_MAIN_IMAGE};
use crate::permission::{authorize, can_mutate};
use crate::store::RelationStore;

/// Which existing people a new PARENT also adopts besides the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Backfill {
    /// Every other parentless lineage member, unless married to someone who
    /// has a parent or to the target. Only applied when the target had no
    /// parent.
    #[default]
    Rootless,
    /// Exactly these people. Each must exist, have no parent, and not be the
    /// target's spouse.
    Only(Vec<String>),
}

/// Add a person relative to `target` and return the new id. Without a target
/// the new person starts a disconnected lineage, whatever the relation type.
pub fn add_person(
    store: &mut RelationStore,
    fields: NewPerson,
    relation: RelationType,
    target: Option<&str>,
) -> Result<String, TreeError> {
    add_person_with(store, fields, relation, target, Backfill::Rootless)
}

/// [`add_person`] gated by the permission check. A PARENT add re-links
/// every adoptee too, so each of them must also be within the actor's reach:
/// an explicit list naming someone outside it is refused, and the default
/// back-fill skips such people.
pub fn add_person_as(
    actor: &Actor,
    store: &mut RelationStore,
    fields: NewPerson,
    relation: RelationType,
    target: Option<&str>,
    backfill: Backfill,
) -> Result<String, TreeError> {
    authorize(actor, target, store)?;
    apply(store, fields, relation, target, backfill, Some(actor))
}

/// [`add_person`] with a choice of back-fill. No permission check.
pub fn add_person_with(
    store: &mut RelationStore,
    fields: NewPerson,
    relation: RelationType,
    target: Option<&str>,
    backfill: Backfill,
) -> Result<String, TreeError> {
    apply(store, fields, relation, target, backfill, None)
}

fn apply(
    store: &mut RelationStore,
    fields: NewPerson,
    relation: RelationType,
    target: Option<&str>,
    backfill: Backfill,
    scope: Option<&Actor>,
) -> Result<String, TreeError> {
    let id = store.next_person_id();
    let mut person = validate_fields(id.clone(), fields)?;

    let Some(target_id) = target else {
        store.push(person);
        tracing::info!(%id, "added root person");
        return Ok(id);
    };
    let existing = store
        .get(target_id)
        .ok_or_else(|| ValidationError::UnknownPerson(target_id.to_string()))?;

    match relation {
        RelationType::Child => {
            person.parent_id = Some(target_id.to_string());
            store.push(person);
        }
        RelationType::Sibling => {
            person.parent_id = existing.parent_id.clone();
            store.push(person);
        }
        RelationType::Spouse => {
            if existing.spouse_id.is_some() {
                return Err(ValidationError::AlreadyMarried(target_id.to_string()).into());
            }
            person.spouse_id = Some(target_id.to_string());
            store.push(person);
            if let Some(t) = store.get_mut(target_id) {
                t.spouse_id = Some(id.clone());
            }
        }
        RelationType::Parent => {
            if existing.parent_id.is_some() {
                return Err(ValidationError::AlreadyHasParent(target_id.to_string()).into());
            }
            let adopted = adoptees(store, target_id, &backfill, scope)?;
            store.push(person);
            for child in std::iter::once(target_id.to_string()).chain(adopted) {
                if let Some(c) = store.get_mut(&child) {
                    c.parent_id = Some(id.clone());
                }
            }
        }
    }

    tracing::info!(%id, %relation, target_id, "added person");
    Ok(id)
}

fn validate_fields(id: String, fields: NewPerson) -> Result<Person, ValidationError> {
    let name = fields.name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    let birth_date = fields
        .birth_date
        .ok_or(ValidationError::MissingField("birthDate"))?;
    if fields.death_date.is_some_and(|d| d < birth_date) {
        return Err(ValidationError::DeathBeforeBirth);
    }
    let main_image = fields
        .main_image
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MAIN_IMAGE.to_string());

    Ok(Person {
        id,
        name: name.to_string(),
        gender: fields.gender.unwrap_or_default(),
        birth_date,
        death_date: fields.death_date,
        bio: fields.bio.unwrap_or_default(),
        main_image,
        gallery: Vec::new(),
        parent_id: None,
        spouse_id: None,
    })
}

/// People who become siblings of `target` under a new parent. With a
/// `scope`, only people that actor may modify are eligible.
fn adoptees(
    store: &RelationStore,
    target: &str,
    backfill: &Backfill,
    scope: Option<&Actor>,
) -> Result<Vec<String>, TreeError> {
    let partner = store.get(target).and_then(|t| t.spouse_id.as_deref());
    let in_reach = |id: &str| scope.map_or(true, |actor| can_mutate(actor, Some(id), store));
    match backfill {
        Backfill::Rootless => {
            let marries_into_family = |p: &Person| {
                store
                    .spouse_of(&p.id)
                    .is_some_and(|s| s.parent_id.is_some())
            };
            Ok(classify(store)
                .lineage
                .into_iter()
                .filter(|p| {
                    p.id != target
                        && Some(p.id.as_str()) != partner
                        && p.parent_id.is_none()
                        && !marries_into_family(p)
                        && in_reach(&p.id)
                })
                .map(|p| p.id.clone())
                .collect())
        }
        Backfill::Only(ids) => {
            let mut out: Vec<String> = Vec::with_capacity(ids.len());
            for id in ids {
                if id == target || out.contains(id) {
                    continue;
                }
                let p = store
                    .get(id)
                    .ok_or_else(|| ValidationError::UnknownPerson(id.clone()))?;
                if partner == Some(id.as_str()) {
                    return Err(ValidationError::SpouseAsSibling(id.clone()).into());
                }
                if p.parent_id.is_some() {
                    return Err(ValidationError::NotRootless(id.clone(), RelationType::Parent).into());
                }
                if let Some(actor) = scope.filter(|_| !in_reach(id)) {
                    tracing::info!(role = %actor.role, adoptee = %id, "back-fill refused");
                    return Err(TreeError::PermissionDenied {
                        role: actor.role,
                        target: Some(id.clone()),
                    });
                }
                out.push(id.clone());
            }
            Ok(out)
        }
    }
}
