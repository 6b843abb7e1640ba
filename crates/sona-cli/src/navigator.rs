//! Guided question flow: category list, question list, answer.
//!
//! Every transition is rejected while a request is outstanding. Only
//! selecting a question produces an outbound request.

use crate::catalog::Category;
use crate::format::Document;
use crate::media::{MediaKind, MediaPanel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Categories,
    Questions { category: usize },
    Answer { category: usize, question: String },
}

/// An interactive control currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Back,
    Category(usize),
    Question(usize),
    Media(MediaKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    Ask(String),
    PlayMedia(MediaKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub document: Document,
    pub media: Option<MediaPanel>,
}

pub struct Navigator {
    categories: &'static [Category],
    state: NavState,
    current_category: Option<usize>,
    answer: Option<Answer>,
    busy: bool,
    focus: usize,
}

impl Navigator {
    pub fn new(categories: &'static [Category]) -> Self {
        Self {
            categories,
            state: NavState::Categories,
            current_category: None,
            answer: None,
            busy: false,
            focus: 0,
        }
    }

    pub fn categories(&self) -> &'static [Category] {
        self.categories
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn current_category(&self) -> Option<usize> {
        self.current_category
    }

    pub fn answer(&self) -> Option<&Answer> {
        self.answer.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn select_category(&mut self, index: usize) -> bool {
        if self.busy || index >= self.categories.len() {
            return false;
        }
        self.state = NavState::Questions { category: index };
        self.current_category = Some(index);
        self.answer = None;
        self.reset_focus();
        true
    }

    /// Moves to the answer display and returns the question to send.
    pub fn select_question(&mut self, index: usize) -> Option<String> {
        if self.busy {
            return None;
        }
        let NavState::Questions { category } = self.state else {
            return None;
        };
        let question = self.categories[category].questions.get(index)?.to_string();
        self.state = NavState::Answer {
            category,
            question: question.clone(),
        };
        self.answer = None;
        self.busy = true;
        self.reset_focus();
        Some(question)
    }

    pub fn go_back(&mut self) -> bool {
        if self.busy {
            return false;
        }
        match self.state {
            NavState::Answer { category, .. } => {
                self.state = NavState::Questions { category };
                self.answer = None;
            }
            NavState::Questions { .. } => self.state = NavState::Categories,
            NavState::Categories => return false,
        }
        self.reset_focus();
        true
    }

    /// Ends the outstanding request and shows its outcome.
    pub fn finish_request(&mut self, answer: Answer) {
        self.busy = false;
        if matches!(self.state, NavState::Answer { .. }) {
            self.answer = Some(answer);
        }
        self.reset_focus();
    }

    pub fn reset(&mut self) {
        self.state = NavState::Categories;
        self.current_category = None;
        self.answer = None;
        self.busy = false;
        self.focus = 0;
    }

    /// Controls in display order.
    pub fn controls(&self) -> Vec<Control> {
        match &self.state {
            NavState::Categories => (0..self.categories.len()).map(Control::Category).collect(),
            NavState::Questions { category } => {
                let count = self.categories[*category].questions.len();
                std::iter::once(Control::Back)
                    .chain((0..count).map(Control::Question))
                    .collect()
            }
            NavState::Answer { .. } => {
                let mut controls = vec![Control::Back];
                if let Some(panel) = self.answer.as_ref().and_then(|a| a.media.as_ref()) {
                    controls.extend(panel.kinds().into_iter().map(Control::Media));
                }
                controls
            }
        }
    }

    pub fn focused(&self) -> Option<Control> {
        self.controls().get(self.focus).copied()
    }

    pub fn focus_next(&mut self) {
        let len = self.controls().len();
        if self.busy || len == 0 {
            return;
        }
        self.focus = (self.focus + 1) % len;
    }

    pub fn focus_prev(&mut self) {
        let len = self.controls().len();
        if self.busy || len == 0 {
            return;
        }
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn focus_first(&mut self) {
        if !self.busy {
            self.focus = 0;
        }
    }

    pub fn focus_last(&mut self) {
        if !self.busy {
            self.focus = self.controls().len().saturating_sub(1);
        }
    }

    /// Same as clicking the focused control.
    pub fn activate(&mut self) -> Option<NavEvent> {
        let control = self.focused()?;
        self.trigger(control)
    }

    pub fn trigger(&mut self, control: Control) -> Option<NavEvent> {
        if self.busy {
            return None;
        }
        match control {
            Control::Back => {
                self.go_back();
                None
            }
            Control::Category(index) => {
                self.select_category(index);
                None
            }
            Control::Question(index) => self.select_question(index).map(NavEvent::Ask),
            Control::Media(kind) => {
                let has_kind = self
                    .answer
                    .as_ref()
                    .and_then(|a| a.media.as_ref())
                    .is_some_and(|panel| panel.kinds().contains(&kind));
                has_kind.then_some(NavEvent::PlayMedia(kind))
            }
        }
    }

    fn reset_focus(&mut self) {
        let controls = self.controls();
        self.focus = match self.state {
            // Land on the previously chosen category when returning to the list.
            NavState::Categories => self.current_category.unwrap_or(0),
            NavState::Questions { .. } => 1,
            NavState::Answer { .. } => 0,
        }
        .min(controls.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AudioSource, Media};
    use crate::catalog::CATEGORIES;

    fn answered(nav: &mut Navigator, media: Option<MediaPanel>) {
        nav.finish_request(Answer {
            document: crate::format::parse("An answer."),
            media,
        });
    }

    fn audio_panel() -> MediaPanel {
        let media = Media {
            video: None,
            audio: Some(AudioSource {
                url: "/a.mp3".to_string(),
                mime: "audio/mpeg".to_string(),
            }),
        };
        MediaPanel::new(media, "http://h").unwrap()
    }

    #[test]
    fn starts_at_category_list() {
        let nav = Navigator::new(CATEGORIES);
        assert_eq!(nav.state(), &NavState::Categories);
        assert_eq!(nav.current_category(), None);
        assert_eq!(nav.controls().len(), CATEGORIES.len());
    }

    #[test]
    fn back_from_question_list_returns_to_categories() {
        let mut nav = Navigator::new(CATEGORIES);
        assert!(nav.select_category(2));
        assert_eq!(nav.state(), &NavState::Questions { category: 2 });
        assert!(nav.go_back());
        assert_eq!(nav.state(), &NavState::Categories);
        assert_eq!(nav.current_category(), Some(2));
        assert_eq!(nav.focused(), Some(Control::Category(2)));
        assert!(!nav.go_back());
    }

    #[test]
    fn back_from_answer_returns_to_question_list() {
        let mut nav = Navigator::new(CATEGORIES);
        nav.select_category(2);
        let question = nav.select_question(1).unwrap();
        assert_eq!(question, CATEGORIES[2].questions[1]);
        answered(&mut nav, None);
        assert!(matches!(nav.state(), NavState::Answer { category: 2, .. }));
        assert!(nav.go_back());
        assert_eq!(nav.state(), &NavState::Questions { category: 2 });
        assert!(nav.answer().is_none());
    }

    #[test]
    fn out_of_range_selections_are_ignored() {
        let mut nav = Navigator::new(CATEGORIES);
        assert!(!nav.select_category(CATEGORIES.len()));
        assert_eq!(nav.current_category(), None);
        assert_eq!(nav.select_question(0), None);
        nav.select_category(0);
        assert_eq!(nav.select_question(99), None);
        assert_eq!(nav.state(), &NavState::Questions { category: 0 });
    }

    #[test]
    fn transitions_are_rejected_while_busy() {
        let mut nav = Navigator::new(CATEGORIES);
        nav.select_category(0);
        nav.select_question(0).unwrap();
        assert!(nav.is_busy());
        assert!(!nav.go_back());
        assert!(!nav.select_category(1));
        let focus = nav.focus();
        nav.focus_next();
        assert_eq!(nav.focus(), focus);
        assert_eq!(nav.activate(), None);

        answered(&mut nav, None);
        assert!(!nav.is_busy());
        assert!(nav.go_back());
    }

    #[test]
    fn only_question_selection_asks() {
        let mut nav = Navigator::new(CATEGORIES);
        assert_eq!(nav.trigger(Control::Category(1)), None);
        assert_eq!(nav.focused(), Some(Control::Question(0)));
        assert_eq!(
            nav.activate(),
            Some(NavEvent::Ask(CATEGORIES[1].questions[0].to_string()))
        );
    }

    #[test]
    fn focus_moves_in_document_order_and_wraps() {
        let mut nav = Navigator::new(CATEGORIES);
        nav.select_category(0);
        let count = CATEGORIES[0].questions.len();
        nav.focus_first();
        assert_eq!(nav.focused(), Some(Control::Back));
        nav.focus_prev();
        assert_eq!(nav.focused(), Some(Control::Question(count - 1)));
        nav.focus_next();
        assert_eq!(nav.focused(), Some(Control::Back));
        nav.focus_last();
        assert_eq!(nav.focused(), Some(Control::Question(count - 1)));
        nav.focus_first();
        assert_eq!(nav.activate(), None);
        assert_eq!(nav.state(), &NavState::Categories);
    }

    #[test]
    fn media_controls_follow_back() {
        let mut nav = Navigator::new(CATEGORIES);
        nav.select_category(3);
        nav.select_question(0);
        answered(&mut nav, Some(audio_panel()));
        assert_eq!(nav.controls(), vec![Control::Back, Control::Media(MediaKind::Audio)]);
        nav.focus_next();
        assert_eq!(nav.activate(), Some(NavEvent::PlayMedia(MediaKind::Audio)));
        assert_eq!(nav.trigger(Control::Media(MediaKind::Video)), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut nav = Navigator::new(CATEGORIES);
        nav.select_category(4);
        nav.select_question(2);
        nav.reset();
        assert_eq!(nav.state(), &NavState::Categories);
        assert_eq!(nav.current_category(), None);
        assert!(!nav.is_busy());
    }
}
