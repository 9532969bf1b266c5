mod image;
mod lifecycle;
mod speech;
mod text;
mod tools;
mod tts;
mod vision;

pub use image::{ImageController, ImageInput};
pub use lifecycle::{submit, FeatureContext, FeatureController, Outcome};
pub use speech::{AudioSource, SpeechController, SpeechInput};
pub use text::{TextController, TextInput};
pub use tools::{ToolsController, ToolsInput};
pub use tts::{TtsController, TtsInput};
pub use vision::{ImageSource, ImageUrlPreview, VisionController, VisionInput};

/// Controller state, rendered by the page as the trigger's label and
/// enabled flag plus the loading indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Validating,
    InFlight {
        busy_label: &'static str,
    },
    Succeeded,
    Failed,
}
