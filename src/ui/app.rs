use tui::widgets::ListState;

use crate::{models::todo_model::Todo, sync::SyncSession};

pub struct StatefulList<T> {
    pub state: ListState,
    pub items: Vec<T>,
}

impl<T> StatefulList<T> {
    pub fn with_items(items: Vec<T>) -> StatefulList<T> {
        StatefulList {
            state: ListState::default(),
            items,
        }
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }

        let i = match self.state.selected() {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }

        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn unselect(&mut self) {
        self.state.select(None);
    }

    pub fn selected(&self) -> Option<&T> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    /// Swaps in new items, keeping the cursor inside the list
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;

        match self.state.selected() {
            Some(_) if self.items.is_empty() => self.state.select(None),
            Some(i) if i >= self.items.len() => self.state.select(Some(self.items.len() - 1)),
            _ => {}
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Pane {
    Mine,
    Team,
}

pub enum InputMode {
    None,
    Editing,
}

/// State of the live board: the sync session plus what the two panes show.
///
/// `mine` and `team` are snapshots of the session; call [`App::sync_lists`]
/// after the session changes.
pub struct App {
    pub session: SyncSession,
    pub mine: StatefulList<Todo>,
    pub team: StatefulList<Todo>,
    pub focus: Pane,
    pub error_message: String,
    pub input_text: String,
    pub message: String,
    /// Footer line, for background notices
    pub status: String,
    pub input_mode: InputMode,
    /// Whether the todo being typed goes to the team
    pub pending_team: bool,
    navigation_stack: Vec<Route>,
}

#[derive(Debug)]
pub struct Route {
    pub active_block: ActiveBlock,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ActiveBlock {
    Home,
    Error,
    Message,
    NewTodo,
}

pub const DEFAULT_ROUTE: Route = Route {
    active_block: ActiveBlock::Home,
};

impl App {
    pub fn new(session: SyncSession) -> App {
        let mut app = App {
            session,
            mine: StatefulList::with_items(vec![]),
            team: StatefulList::with_items(vec![]),
            focus: Pane::Mine,
            error_message: String::new(),
            input_mode: InputMode::None,
            input_text: String::new(),
            message: String::new(),
            status: String::new(),
            pending_team: false,
            navigation_stack: vec![DEFAULT_ROUTE],
        };
        app.sync_lists();
        app
    }

    /// Refills both panes from the session
    pub fn sync_lists(&mut self) {
        let mine = self.session.mine().into_iter().cloned().collect();
        let team = self.session.team().into_iter().cloned().collect();

        self.mine.set_items(mine);
        self.team.set_items(team);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Pane::Mine => Pane::Team,
            Pane::Team => Pane::Mine,
        };
    }

    pub fn focused_list_mut(&mut self) -> &mut StatefulList<Todo> {
        match self.focus {
            Pane::Mine => &mut self.mine,
            Pane::Team => &mut self.team,
        }
    }

    pub fn selected_todo(&self) -> Option<&Todo> {
        match self.focus {
            Pane::Mine => self.mine.selected(),
            Pane::Team => self.team.selected(),
        }
    }

    /// Gets the current active route
    pub fn get_current_route(&self) -> &Route {
        self.navigation_stack.last().unwrap_or(&DEFAULT_ROUTE)
    }

    /// Push a route to the navigation stack
    /// so that it is rendered
    pub fn push_navigation_stack(&mut self, active_block: ActiveBlock) {
        self.navigation_stack.push(Route { active_block });
    }

    pub fn pop_navigation_stack(&mut self) -> Option<Route> {
        if self.navigation_stack.len() == 1 {
            None
        } else {
            self.navigation_stack.pop()
        }
    }

    pub fn start_new_todo(&mut self, team: bool) {
        self.push_navigation_stack(ActiveBlock::NewTodo);
        self.input_mode = InputMode::Editing;
        self.input_text = String::new();
        self.pending_team = team;
    }

    /// Leaves input mode, returning what was typed
    pub fn finish_new_todo(&mut self) -> String {
        self.pop_navigation_stack();
        self.input_mode = InputMode::None;
        std::mem::take(&mut self.input_text)
    }

    pub fn handle_error(&mut self, e: String) {
        self.dismiss_popup();
        self.push_navigation_stack(ActiveBlock::Error);
        self.error_message = e;
    }

    pub fn handle_new_message(&mut self, m: String) {
        self.dismiss_popup();
        self.push_navigation_stack(ActiveBlock::Message);
        self.message = m;
    }

    fn dismiss_popup(&mut self) {
        let active_block = self.get_current_route().active_block;
        if active_block == ActiveBlock::Message || active_block == ActiveBlock::Error {
            self.pop_navigation_stack();
        }
    }
}
