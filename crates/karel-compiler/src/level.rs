use std::fmt;
use std::str::FromStr;

/// How far a learner has progressed; gates `while` loops and recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CurriculumLevel {
    /// Commands, `repeat` and `if/else` only
    #[default]
    Basics,
    /// Additionally `while` loops
    Loops,
    /// Additionally recursive commands
    Recursion,
}

impl CurriculumLevel {
    pub fn name(self) -> &'static str {
        match self {
            CurriculumLevel::Basics => "basics",
            CurriculumLevel::Loops => "loops",
            CurriculumLevel::Recursion => "recursion",
        }
    }
}

impl fmt::Display for CurriculumLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CurriculumLevel {
    type Err = String;

    /// Accepts the level name or its number (1 to 3).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basics" | "1" => Ok(CurriculumLevel::Basics),
            "loops" | "2" => Ok(CurriculumLevel::Loops),
            "recursion" | "3" => Ok(CurriculumLevel::Recursion),
            other => Err(format!(
                "unknown level '{}' (expected basics, loops or recursion)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(CurriculumLevel::Basics < CurriculumLevel::Loops);
        assert!(CurriculumLevel::Loops < CurriculumLevel::Recursion);
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("Loops".parse::<CurriculumLevel>(), Ok(CurriculumLevel::Loops));
        assert_eq!("3".parse::<CurriculumLevel>(), Ok(CurriculumLevel::Recursion));
        assert!("week4".parse::<CurriculumLevel>().is_err());
    }
}
