// src/handlers/menu.rs
use chrono::Utc;
use serde::Serialize;
use warp::reply::Json;
use warp::Rejection;

use crate::models::Period;
use crate::services::import::current_period;

/// How many years back the period picker offers.
const MENU_YEARS: i32 = 5;

#[derive(Debug, Serialize, PartialEq)]
pub struct Menu {
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub current: Period,
}

pub fn build_menu(current: Period) -> Menu {
    Menu {
        years: (0..MENU_YEARS).map(|back| current.year - back).collect(),
        months: (1..=12).collect(),
        current,
    }
}

pub async fn get_menu() -> Result<Json, Rejection> {
    Ok(warp::reply::json(&build_menu(current_period(Utc::now()))))
}
