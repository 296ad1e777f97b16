pub mod editor;
pub mod gesture;
pub mod input;
pub mod shortcuts;
pub mod tools;

pub use editor::{Editor, EditorConfig, EditorEffect};
pub use gesture::{Gesture, GestureMachine, ResizeState, resize_bounds};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::ToolKind;
