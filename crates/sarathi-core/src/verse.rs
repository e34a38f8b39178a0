//! Verse of the day.
//!
//! The verse is chosen by local calendar date: index `day_of_year % len`,
//! where January 1st is day 1.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::source::Source;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub sanskrit: String,
    pub translation: String,
    pub reference: String,
}

/// 1-based ordinal of `date` within its year
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerseBook {
    verses: Vec<Verse>,
}

impl VerseBook {
    pub fn new(verses: Vec<Verse>) -> Self {
        Self { verses }
    }

    pub async fn load(client: &Client, source: &Source) -> Result<Self> {
        let verses: Vec<Verse> = source
            .fetch_json(client)
            .await
            .with_context(|| format!("loading verses from {}", source))?;
        Ok(Self::new(verses))
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn index_for(&self, date: NaiveDate) -> Option<usize> {
        if self.verses.is_empty() {
            None
        } else {
            Some(day_of_year(date) as usize % self.verses.len())
        }
    }

    pub fn verse_for(&self, date: NaiveDate) -> Option<&Verse> {
        self.index_for(date).and_then(|i| self.verses.get(i))
    }

    pub fn today(&self) -> Option<&Verse> {
        self.verse_for(Local::now().date_naive())
    }
}
