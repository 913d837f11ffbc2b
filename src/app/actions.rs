use std::collections::HashMap;
use std::fmt::{self, Display};
use std::slice::Iter;

use crate::inputs::key::Key;

/// We define all available action
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Action {
    Quit,
    SwitchTab,
    Next,
    Previous,
    Refresh,
    StartContainer,
    StopContainer,
    RemoveContainer,
    ShowLogs,
    ShowUsage,
    RunImage,
    RunImageInteractive,
    RemoveImage,
    ScrollUp,
    ScrollDown,
    Search,
    DeleteChar,
}

impl Action {
    /// All available actions
    pub fn iterator() -> Iter<'static, Action> {
        static ACTIONS: [Action; 17] = [
            Action::Quit,
            Action::SwitchTab,
            Action::Next,
            Action::Previous,
            Action::Refresh,
            Action::StartContainer,
            Action::StopContainer,
            Action::RemoveContainer,
            Action::ShowLogs,
            Action::ShowUsage,
            Action::RunImage,
            Action::RunImageInteractive,
            Action::RemoveImage,
            Action::ScrollUp,
            Action::ScrollDown,
            Action::Search,
            Action::DeleteChar,
        ];
        ACTIONS.iter()
    }

    /// List of key associated to action
    pub fn keys(&self) -> &[Key] {
        match self {
            Action::Quit => &[Key::Char('q'), Key::Ctrl('c'), Key::Esc],
            Action::SwitchTab => &[Key::Tab],
            Action::Next => &[Key::Down, Key::Char('j')],
            Action::Previous => &[Key::Up, Key::Char('k')],
            Action::Refresh => &[Key::Char('r')],
            Action::StartContainer => &[Key::Char('s')],
            Action::StopContainer => &[Key::Char('x')],
            Action::RemoveContainer => &[Key::Char('d')],
            Action::ShowLogs => &[Key::Char('l')],
            Action::ShowUsage => &[Key::Char('u')],
            Action::RunImage => &[Key::Enter],
            Action::RunImageInteractive => &[Key::Char('i')],
            Action::RemoveImage => &[Key::Char('d')],
            Action::ScrollUp => &[Key::Up, Key::PageUp],
            Action::ScrollDown => &[Key::Down, Key::PageDown],
            Action::Search => &[Key::Char('/'), Key::Enter],
            Action::DeleteChar => &[Key::Backspace],
        }
    }
}

/// Could display a user friendly short description of action
impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let str = match self {
            Action::Quit => "Quit",
            Action::SwitchTab => "Switch Tab",
            Action::Next => "Next",
            Action::Previous => "Previous",
            Action::Refresh => "Refresh",
            Action::StartContainer => "Start",
            Action::StopContainer => "Stop",
            Action::RemoveContainer => "Remove",
            Action::ShowLogs => "Logs",
            Action::ShowUsage => "Usage",
            Action::RunImage => "Run",
            Action::RunImageInteractive => "Run Interactive",
            Action::RemoveImage => "Remove",
            Action::ScrollUp => "Scroll Up",
            Action::ScrollDown => "Scroll Down",
            Action::Search => "Search",
            Action::DeleteChar => "Delete",
        };
        match self.keys().first() {
            Some(key) => write!(f, "{} {}", key, str),
            None => write!(f, "{}", str),
        }
    }
}

/// The application should have some contextual actions.
#[derive(Default, Debug, Clone)]
pub struct Actions(Vec<Action>);

impl Actions {
    /// Given a key, find the corresponding action
    pub fn find(&self, key: Key) -> Option<&Action> {
        Action::iterator()
            .filter(|action| self.0.contains(action))
            .find(|action| action.keys().contains(&key))
    }

    /// Get contextual actions.
    /// (just for building a help view)
    pub fn actions(&self) -> &[Action] {
        self.0.as_slice()
    }
}

impl From<Vec<Action>> for Actions {
    /// Build contextual action
    ///
    /// # Panics
    ///
    /// If two actions have same key
    fn from(actions: Vec<Action>) -> Self {
        // Check key unicity
        let mut map: HashMap<Key, Vec<Action>> = HashMap::new();
        for action in actions.iter() {
            for key in action.keys().iter() {
                map.entry(*key).or_default().push(*action);
            }
        }
        let errors = map
            .iter()
            .filter(|(_, actions)| actions.len() > 1) // at least two actions share same shortcut
            .map(|(key, actions)| {
                let actions = actions
                    .iter()
                    .map(Action::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Conflict key {} with actions {}", key, actions)
            })
            .collect::<Vec<_>>();
        if !errors.is_empty() {
            panic!("{}", errors.join("; "))
        }

        // Ok, we can create contextual actions
        Self(actions)
    }
}

impl Display for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions = self
            .0
            .iter()
            .map(Action::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        write!(f, "{}", actions)
    }
}
