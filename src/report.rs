// 📊 Import Report - new towns per source file

use crate::translate::Translator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// "Governorate - City"
    pub source: String,
    pub new_towns: usize,
}

/// Per-file counts in walk order; files with nothing new are left out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub destination: String,
    pub entries: Vec<ReportEntry>,
}

impl ImportReport {
    pub fn new(destination: &str) -> Self {
        ImportReport {
            destination: destination.to_string(),
            entries: Vec::new(),
        }
    }

    /// Add the count for one file. Zero counts are dropped; a key seen
    /// twice accumulates into the existing entry.
    pub fn record(&mut self, source: &str, new_towns: usize) {
        if new_towns == 0 {
            return;
        }

        match self.entries.iter_mut().find(|e| e.source == source) {
            Some(entry) => entry.new_towns += new_towns,
            None => self.entries.push(ReportEntry {
                source: source.to_string(),
                new_towns,
            }),
        }
    }

    pub fn get(&self, source: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.source == source)
            .map(|e| e.new_towns)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.new_towns).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.entries
            .iter()
            .map(|e| (e.source.clone(), e.new_towns))
            .collect()
    }

    /// Display lines, labels passed through `translator`
    pub fn render(&self, translator: &dyn Translator) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{}: {} new towns", translator.translate(&e.source), e.new_towns))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Passthrough;

    struct Shouting;

    impl Translator for Shouting {
        fn translate(&self, text: &str) -> String {
            text.to_uppercase()
        }
    }

    #[test]
    fn test_zero_counts_are_omitted() {
        let mut report = ImportReport::new("towns.csv");
        report.record("Aleppo - Aleppo", 2);
        report.record("Aleppo - Manbij", 0);

        assert_eq!(report.get("Aleppo - Aleppo"), Some(2));
        assert_eq!(report.get("Aleppo - Manbij"), None);
        assert_eq!(report.total(), 2);
        assert_eq!(report.to_map().len(), 1);
    }

    #[test]
    fn test_render_keeps_order_and_translates() {
        let mut report = ImportReport::new("towns.csv");
        report.record("idlib - harem", 3);
        report.record("aleppo - aleppo", 1);

        assert_eq!(
            report.render(&Shouting),
            vec!["IDLIB - HAREM: 3 new towns", "ALEPPO - ALEPPO: 1 new towns"]
        );
        assert_eq!(report.render(&Passthrough)[0], "idlib - harem: 3 new towns");
    }

    #[test]
    fn test_empty_report() {
        let report = ImportReport::new("towns.db");
        assert!(report.is_empty());
        assert_eq!(report.total(), 0);
        assert!(report.render(&Passthrough).is_empty());
    }
}
