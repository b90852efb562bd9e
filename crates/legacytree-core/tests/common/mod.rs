#![allow(dead_code)]

use chrono::NaiveDate;
use legacytree_core::{Gender, Person};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn person(id: &str) -> Person {
    Person {
        id: id.to_string(),
        name: format!("Person {id}"),
        gender: Gender::Other,
        birth_date: date(1960, 6, 1),
        death_date: None,
        bio: String::new(),
        main_image: String::new(),
        gallery: Vec::new(),
        parent_id: None,
        spouse_id: None,
    }
}

pub fn child(id: &str, parent: &str) -> Person {
    Person {
        parent_id: Some(parent.to_string()),
        ..person(id)
    }
}

pub fn married(mut p: Person, spouse: &str) -> Person {
    p.spouse_id = Some(spouse.to_string());
    p
}
