//! Template renderer and rendering functionality for Stencil.
//! Used both to expand file names and to produce file bodies, with
//! MiniJinja as the default engine.
use crate::error::{StencilError, StencilResult};
use crate::vars::Vars;
use cruet::Inflector;
use minijinja::{Environment, ErrorKind};

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given bindings.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `vars` - Bindings available to the template
    ///
    /// # Returns
    /// * `StencilResult<String>` - Rendered template string
    ///
    /// # Errors
    /// * `StencilError::TemplateParseError` if the template has invalid syntax
    /// * `StencilError::TemplateError` if execution fails
    fn render(&self, template: &str, vars: &Vars) -> StencilResult<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a new MiniJinjaRenderer with the case conversion filters registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_filter("snake_case", |value: String| value.to_snake_case());
        env.add_filter("kebab_case", |value: String| value.to_kebab_case());
        env.add_filter("camel_case", |value: String| value.to_camel_case());
        env.add_filter("pascal_case", |value: String| value.to_pascal_case());
        env.add_filter("title_case", |value: String| value.to_title_case());
        Self { env }
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        MiniJinjaRenderer::new()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, template: &str, vars: &Vars) -> StencilResult<String> {
        self.env.render_str(template, vars).map_err(|e| {
            if e.kind() == ErrorKind::SyntaxError {
                StencilError::TemplateParseError(e.to_string())
            } else {
                StencilError::TemplateError(e.to_string())
            }
        })
    }
}

/// Returns true when `text` contains template markup worth rendering.
pub fn has_template_markup(text: &str) -> bool {
    text.contains("{{") || text.contains("{%") || text.contains("{#")
}
