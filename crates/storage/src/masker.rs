// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::borrow::Cow;

const MASK: &str = "********";

/// Replaces known secrets in script output before it is written to the log.
#[derive(Debug, Clone, Default)]
pub struct SensitiveValueMasker {
    values: Vec<String>,
}

impl SensitiveValueMasker {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: Vec<String> =
            values.into_iter().map(Into::into).filter(|v| !v.trim().is_empty()).collect();
        // Longest first so a secret that contains another is masked whole
        values.sort_by_key(|v| std::cmp::Reverse(v.len()));
        values.dedup();
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn mask<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for value in &self.values {
            if out.contains(value.as_str()) {
                out = Cow::Owned(out.replace(value.as_str(), MASK));
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "masker_tests.rs"]
mod tests;
