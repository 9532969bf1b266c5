pub mod html;
mod page;
pub mod results_view;
mod surface;

pub use page::{HtmlPage, Pane};
pub use results_view::{ResultsView, SavedResultCard};
pub use surface::ResultSurface;
