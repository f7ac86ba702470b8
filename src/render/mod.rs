pub mod assets;
mod composer;
pub mod layout;
pub mod selector;
pub mod text;

pub use assets::{AssetLoadError, AssetLoader, AssetService, Gallery, IconSource};
pub use composer::{
    load_typeface, ComposerOptions, ImageComposer, RenderError, DEFAULT_PHRASES,
    DEFAULT_TITLE_TEMPLATE,
};
pub use selector::RandomSelector;
