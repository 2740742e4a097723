/// Generator of `"{prefix}_{k}"` names, `k = 0, 1, 2, ...`.
///
/// One instance belongs to one pass over one function. Names are never
/// recycled.
#[derive(Debug)]
pub struct FreshNames {
    prefix: String,
    next: u64,
}

impl FreshNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn next_name(&mut self) -> String {
        let name = format!("{}_{}", self.prefix, self.next);
        self.next += 1;
        name
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }

    /// Whether `name` has the shape this generator produces, issued or not.
    pub fn owns(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .map_or(false, |k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl Iterator for FreshNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_sequential() {
        let mut fresh = FreshNames::new("_tac_f");
        assert_eq!(fresh.next_name(), "_tac_f_0");
        assert_eq!(fresh.next_name(), "_tac_f_1");
        assert_eq!(fresh.next_name(), "_tac_f_2");
        assert_eq!(fresh.issued(), 3);
    }

    #[test]
    fn names_are_unique_and_increasing() {
        let names: Vec<String> = FreshNames::new("p").take(500).collect();
        let distinct: HashSet<&String> = names.iter().collect();
        assert_eq!(distinct.len(), names.len());

        let suffixes: Vec<u64> = names
            .iter()
            .map(|n| n.strip_prefix("p_").unwrap().parse().unwrap())
            .collect();
        assert!(suffixes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn instances_restart() {
        let mut a = FreshNames::new("x");
        a.next_name();
        a.next_name();
        let mut b = FreshNames::new("x");
        assert_eq!(b.next_name(), "x_0");
    }

    #[test]
    fn ownership_check() {
        let fresh = FreshNames::new("_tmp_f");
        assert!(fresh.owns("_tmp_f_0"));
        assert!(fresh.owns("_tmp_f_42"));
        assert!(!fresh.owns("_tmp_f_"));
        assert!(!fresh.owns("_tmp_f_x"));
        assert!(!fresh.owns("_tmp_g_0"));
        assert!(!fresh.owns("z"));
    }
}
