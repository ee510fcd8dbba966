//! A builder style assembly of the read-mostly application state shared by
//! every request: the page registry, header configuration and the template
//! engine.
//!
//! ## Example
//! ```ignore
//! let app = ClickApp::builder(config)
//!     .page::<HomePage>("/home.htm")
//!     .page::<LoginPage>("/login.htm")
//!     .build()?;
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use config::ConfigError;
use tracing::debug;
use tracing::warn;
use unic_langid::LanguageIdentifier;

use crate::constants::ERROR_PATH;
use crate::constants::NOT_FOUND_PATH;
use crate::utils::normalize_path;
use crate::ClickConfig;
use crate::Error;
use crate::ErrorPage;
use crate::ErrorReport;
use crate::Mode;
use crate::NotFoundPage;
use crate::Page;
use crate::PageHeaders;
use crate::PageState;
use crate::RequestError;
use crate::Result;
use crate::SimpleTemplateEngine;
use crate::TemplateEngine;

pub type PageFactory = Arc<dyn Fn() -> Box<dyn Page> + Send + Sync>;
pub type ErrorPageFactory = Arc<dyn Fn(ErrorReport) -> Box<dyn Page> + Send + Sync>;

/// A page type registered under a path
#[derive(Clone)]
pub struct PageEntry {
    path: String,
    template: String,
    type_id: TypeId,
    type_name: &'static str,
    factory: PageFactory,
    headers: PageHeaders,
}

impl PageEntry {
    fn new<P: Page>(
        path: String,
        factory: PageFactory,
    ) -> Self {
        Self {
            template: path.clone(),
            path,
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            factory,
            headers: PageHeaders::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn headers(&self) -> &PageHeaders {
        &self.headers
    }

    pub fn create(&self) -> Box<dyn Page> {
        (self.factory)()
    }

    fn new_state(&self) -> PageState {
        let mut state = PageState::new(&self.path);
        state.set_template(&self.template);
        state.set_headers(self.headers.clone());
        state
    }
}

impl std::fmt::Debug for PageEntry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PageEntry")
            .field("path", &self.path)
            .field("template", &self.template)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Application state initialized once and read by every request.
pub struct ClickApp {
    config: ClickConfig,
    default_locale: Option<LanguageIdentifier>,
    pages: HashMap<String, PageEntry>,
    paths_by_type: HashMap<TypeId, String>,
    not_found: PageEntry,
    error_page: ErrorPageFactory,
    error_state: PageEntry,
    templates: Arc<dyn TemplateEngine>,
}

impl std::fmt::Debug for ClickApp {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let mut paths: Vec<_> = self.pages.keys().collect();
        paths.sort();
        f.debug_struct("ClickApp")
            .field("mode", &self.config.app.mode)
            .field("pages", &paths)
            .finish()
    }
}

impl ClickApp {
    pub fn builder(config: ClickConfig) -> ClickAppBuilder {
        ClickAppBuilder::new(config)
    }

    pub fn config(&self) -> &ClickConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.app.mode
    }

    pub fn is_production(&self) -> bool {
        self.config.app.mode.is_production()
    }

    pub fn charset(&self) -> &str {
        &self.config.app.charset
    }

    pub fn default_locale(&self) -> Option<&LanguageIdentifier> {
        self.default_locale.as_ref()
    }

    pub fn forward_depth_limit(&self) -> usize {
        self.config.app.forward_depth_limit
    }

    pub fn templates(&self) -> &Arc<dyn TemplateEngine> {
        &self.templates
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_entry(
        &self,
        path: &str,
    ) -> Option<&PageEntry> {
        self.pages.get(&normalize_path(path))
    }

    /// Creates the page configured for `path`.
    pub fn create_page(
        &self,
        path: &str,
    ) -> Result<Box<dyn Page>> {
        self.page_entry(path)
            .map(PageEntry::create)
            .ok_or_else(|| RequestError::PageNotConfigured(normalize_path(path)).into())
    }

    /// Path page type `P` was registered under. With several registrations
    /// the first one wins.
    pub fn page_path<P: Page>(&self) -> Result<&str> {
        self.paths_by_type
            .get(&TypeId::of::<P>())
            .map(String::as_str)
            .ok_or_else(|| RequestError::PagePathNotConfigured(std::any::type_name::<P>()).into())
    }

    /// Page and state answering `path`; the not-found page for unconfigured paths.
    pub fn page_for(
        &self,
        path: &str,
    ) -> (Box<dyn Page>, PageState) {
        let entry = self.page_entry(path).unwrap_or_else(|| {
            debug!(path, "no page configured, using the not-found page");
            &self.not_found
        });
        (entry.create(), entry.new_state())
    }

    /// Fresh state for a page instance handed over by a forward.
    pub fn page_state(
        &self,
        path: &str,
    ) -> PageState {
        self.page_entry(path).unwrap_or(&self.not_found).new_state()
    }

    pub fn error_page(
        &self,
        report: ErrorReport,
    ) -> (Box<dyn Page>, PageState) {
        ((self.error_page)(report), self.error_state.new_state())
    }
}

/// Collects page registrations and assembles a validated [`ClickApp`]
pub struct ClickAppBuilder {
    config: ClickConfig,
    pages: Vec<PageEntry>,
    not_found: Option<PageEntry>,
    error_page: Option<ErrorPageFactory>,
    templates: Option<Arc<dyn TemplateEngine>>,
}

impl ClickAppBuilder {
    pub fn new(config: ClickConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            not_found: None,
            error_page: None,
            templates: None,
        }
    }

    /// Registers page type `P` under `path`
    pub fn page<P: Page + Default>(
        self,
        path: &str,
    ) -> Self {
        self.page_with(path, P::default)
    }

    /// Registers page type `P` under `path`, built by `factory` for every request
    pub fn page_with<P, F>(
        mut self,
        path: &str,
        make: F,
    ) -> Self
    where
        P: Page,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let factory: PageFactory = Arc::new(move || -> Box<dyn Page> { Box::new(make()) });
        self.pages.push(PageEntry::new::<P>(normalize_path(path), factory));
        self
    }

    /// Replaces the page answering unconfigured paths
    pub fn not_found_page<P: Page + Default>(mut self) -> Self {
        let factory: PageFactory = Arc::new(|| -> Box<dyn Page> { Box::new(P::default()) });
        self.not_found = Some(PageEntry::new::<P>(NOT_FOUND_PATH.to_string(), factory));
        self
    }

    /// Replaces the page rendering request failures
    pub fn error_page<P, F>(
        mut self,
        factory: F,
    ) -> Self
    where
        P: Page,
        F: Fn(ErrorReport) -> P + Send + Sync + 'static,
    {
        self.error_page = Some(Arc::new(move |report| -> Box<dyn Page> { Box::new(factory(report)) }));
        self
    }

    pub fn template_engine(
        mut self,
        templates: Arc<dyn TemplateEngine>,
    ) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn build(self) -> Result<ClickApp> {
        let config = self.config.validate()?;

        let common_headers = if config.pages.headers.is_empty() {
            PageHeaders::no_cache()
        } else {
            PageHeaders::from_config(&config.pages.headers)?
        };
        let configure = |mut entry: PageEntry| -> Result<PageEntry> {
            entry.headers = common_headers.clone();
            if let Some(page_config) = config.pages.page(&entry.path) {
                if let Some(template) = &page_config.template {
                    entry.template = normalize_path(template);
                }
                entry.headers = common_headers.merged(&PageHeaders::from_config(&page_config.headers)?);
            }
            Ok(entry)
        };

        let mut pages = HashMap::new();
        let mut paths_by_type = HashMap::new();
        for entry in self.pages {
            if pages.contains_key(&entry.path) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "page path {} is registered more than once",
                    entry.path
                ))));
            }
            let entry = configure(entry)?;
            debug!(path = %entry.path, page = entry.type_name, template = %entry.template, "page registered");
            paths_by_type.entry(entry.type_id).or_insert_with(|| entry.path.clone());
            pages.insert(entry.path.clone(), entry);
        }

        for page_config in &config.pages.page {
            let path = normalize_path(&page_config.path);
            if !pages.contains_key(&path) && path != NOT_FOUND_PATH && path != ERROR_PATH {
                warn!("page {} is configured but no page type is registered for it", path);
            }
        }

        let not_found = self.not_found.unwrap_or_else(|| {
            PageEntry::new::<NotFoundPage>(NOT_FOUND_PATH.to_string(), Arc::new(|| -> Box<dyn Page> { Box::new(NotFoundPage) }))
        });
        let not_found = configure(not_found)?;

        let error_page = self
            .error_page
            .unwrap_or_else(|| Arc::new(|report| -> Box<dyn Page> { Box::new(ErrorPage::new(report)) }));
        let error_state = configure(PageEntry::new::<ErrorPage>(
            ERROR_PATH.to_string(),
            Arc::new(|| -> Box<dyn Page> { Box::new(ErrorPage::new(ErrorReport::default())) }),
        ))?;

        let templates = match self.templates {
            Some(templates) => templates,
            None => Arc::new(
                SimpleTemplateEngine::new(&config.app.template_dir).with_cache(config.app.mode.is_production()),
            ),
        };

        Ok(ClickApp {
            default_locale: config.app.default_locale(),
            config,
            pages,
            paths_by_type,
            not_found,
            error_page,
            error_state,
            templates,
        })
    }
}
