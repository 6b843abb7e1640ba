#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub icon: &'static str,
    pub questions: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "Feeding",
        icon: "🍼",
        questions: &[
            "How often should my newborn feed?",
            "How do I know if my baby is getting enough breast milk?",
            "When and how should I start solid foods?",
            "What can I do about frequent spit-up?",
        ],
    },
    Category {
        name: "Sleep",
        icon: "🌙",
        questions: &[
            "How much sleep does my baby need at each age?",
            "What is a safe sleep environment for an infant?",
            "How do I handle a sleep regression?",
            "How can I build a calm bedtime routine?",
        ],
    },
    Category {
        name: "Growth & Milestones",
        icon: "🧸",
        questions: &[
            "Which milestones should my baby reach in the first year?",
            "When do babies usually start crawling and walking?",
            "How can I encourage early language development?",
            "When should I worry about a developmental delay?",
        ],
    },
    Category {
        name: "Health & Illness",
        icon: "🩺",
        questions: &[
            "What temperature counts as a fever in a baby?",
            "Which vaccines are due in the first two years?",
            "How do I ease teething pain?",
            "When should I call the doctor or go to the emergency room?",
        ],
    },
    Category {
        name: "Crying & Behaviour",
        icon: "👶",
        questions: &[
            "Why does my baby cry so much in the evening?",
            "What is colic and how can I soothe it?",
            "How should I respond to toddler tantrums?",
            "Is separation anxiety normal?",
        ],
    },
    Category {
        name: "Parent Wellbeing",
        icon: "💛",
        questions: &[
            "How do I recognise postpartum depression?",
            "How can I rest when my baby wakes at night?",
            "How do I look after my body after delivery?",
            "Where can I find support as a new parent?",
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_populated() {
        assert!(!CATEGORIES.is_empty());
        for category in CATEGORIES {
            assert!(!category.name.is_empty());
            assert!(!category.questions.is_empty(), "{} has no questions", category.name);
        }
    }
}
