use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use http::Method;
use tracing::debug;
use tracing::enabled;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;
use tracing::Level;

use super::ClickApp;
use super::WriterPool;
use crate::constants::CLICK_ADMIN_ROLE;
use crate::constants::RELOAD_APP_PATH;
use crate::constants::RETRY_AFTER_SECS;
use crate::control::panic_message;
use crate::fire_action_events;
use crate::metrics::APP_RELOAD_COUNTER;
use crate::metrics::ERROR_PAGE_COUNTER;
use crate::metrics::REQUEST_COUNTER;
use crate::metrics::REQUEST_DURATION_METRIC;
use crate::utils::absolute_location;
use crate::Context;
use crate::Error;
use crate::ErrorReport;
use crate::FireOutcome;
use crate::Forward;
use crate::Navigation;
use crate::Page;
use crate::PageCx;
use crate::PageState;
use crate::Request;
use crate::RequestError;
use crate::Response;
use crate::Result;
use crate::ServletConfig;
use crate::SessionStore;
use crate::SystemError;

/// Builds the application, on startup and on every reload
pub type AppLoader = Arc<dyn Fn() -> Result<ClickApp> + Send + Sync>;

const RELOADED_HTML: &str = "<html><head><title>Click Framework</title></head>\
<body><h2>Application Reloaded</h2></body></html>";

/// Request dispatcher driving pages through their life-cycle.
///
/// Every call to [`ClickServlet::service`] runs synchronously on the calling
/// thread. The application state is swapped atomically, so a reload never
/// disturbs requests already in flight.
pub struct ClickServlet {
    loader: AppLoader,
    app: ArcSwapOption<ClickApp>,
    config: ServletConfig,
    sessions: Arc<SessionStore>,
    pub(super) writers: WriterPool,
}

impl std::fmt::Debug for ClickServlet {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClickServlet")
            .field("initialized", &self.app.load().is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl ClickServlet {
    pub fn new(
        config: ServletConfig,
        loader: AppLoader,
    ) -> Self {
        Self {
            loader,
            app: ArcSwapOption::empty(),
            sessions: Arc::new(SessionStore::new(Duration::from_secs(config.session_timeout_secs))),
            writers: WriterPool::new(config.writer_pool_size),
            config,
        }
    }

    /// Loads the application. On failure the servlet stays up and answers
    /// every request as unavailable.
    pub fn init(&self) -> Result<()> {
        info!("initializing Click application");
        match (self.loader)() {
            Ok(app) => {
                info!(mode = %app.mode(), pages = app.page_count(), "Click application initialized");
                self.app.store(Some(Arc::new(app)));
                Ok(())
            }
            Err(e) => {
                error!("error initializing Click application: {}", e);
                self.app.store(None);
                Err(e)
            }
        }
    }

    pub fn destroy(&self) {
        if let Some(app) = self.app.swap(None) {
            app.templates().clear_cache();
        }
        info!("Click application destroyed");
    }

    pub fn app(&self) -> Option<Arc<ClickApp>> {
        self.app.load_full()
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn is_reloadable(&self) -> bool {
        self.config.app_reloadable
    }

    fn ensure_app_initialized(&self) -> Result<Arc<ClickApp>> {
        match self.app.load_full() {
            Some(app) => Ok(app),
            None => {
                let retry_after = self
                    .config
                    .app_reloadable
                    .then(|| Duration::from_secs(RETRY_AFTER_SECS));
                Err(SystemError::Unavailable {
                    reason: "Click application is not initialized".to_string(),
                    retry_after,
                }
                .into())
            }
        }
    }

    fn is_reload_request(
        &self,
        request: &Request,
    ) -> bool {
        self.config.app_reloadable && request.path() == RELOAD_APP_PATH && request.is_user_in_role(CLICK_ADMIN_ROLE)
    }

    /// Rebuilds the application through the loader. A failed reload leaves
    /// the servlet unavailable until the next successful one.
    pub fn reload_app(&self) -> Result<()> {
        info!("reloading Click application");
        APP_RELOAD_COUNTER.inc();
        if let Some(app) = self.app.load_full() {
            app.templates().clear_cache();
        }
        self.init()
    }

    /// Serves one request and returns the finished response.
    ///
    /// Only GET, HEAD and POST are served. Failures that could not be turned
    /// into an error page are returned to the caller.
    pub fn service(
        &self,
        request: Request,
    ) -> Result<Response> {
        let method = request.method().clone();
        if !matches!(method, Method::GET | Method::HEAD | Method::POST) {
            return Err(RequestError::MethodNotAllowed(method.to_string()).into());
        }

        let start = Instant::now();
        let result = if self.is_reload_request(&request) {
            self.reload_app().and_then(|()| {
                let mut response = Response::new();
                response.set_content_type("text/html")?;
                response.write_str(RELOADED_HTML);
                response.commit();
                Ok(response)
            })
        } else {
            self.ensure_app_initialized()
                .and_then(|app| self.handle_request(app, request))
        };

        let status = match &result {
            Ok(response) => response.status().as_u16(),
            Err(Error::System(SystemError::Unavailable { .. })) => 503,
            Err(_) => 500,
        };
        REQUEST_COUNTER
            .with_label_values(&[method.as_str(), &status.to_string()])
            .inc();
        REQUEST_DURATION_METRIC
            .with_label_values(&[method.as_str()])
            .observe(start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    fn handle_request(
        &self,
        app: Arc<ClickApp>,
        request: Request,
    ) -> Result<Response> {
        let start = Instant::now();
        debug!("{} {}", request.method(), request.request_uri());
        if enabled!(Level::TRACE) {
            for (name, values) in request.parameters() {
                trace!("   request param: {}={:?}", name, values);
            }
        }

        let production = app.is_production();
        let context = Context::new(app, self.sessions.clone(), request);
        self.dispatch(&context, None, 0)?;

        if !production {
            info!(
                "handleRequest: {} - {} ms",
                context.resource_path(),
                start.elapsed().as_millis()
            );
        }
        let mut response = context.take_response();
        response.commit();
        Ok(response)
    }

    /// Runs the page answering the context's path, or the page a forward
    /// handed over, and destroys it whatever happened.
    fn dispatch(
        &self,
        context: &Context,
        forwarded: Option<Box<dyn Page>>,
        depth: usize,
    ) -> Result<()> {
        let _scope = context.push_thread_local();
        let app = context.app().clone();
        let path = context.resource_path();

        let (mut page, mut state) = match forwarded {
            Some(page) => (page, app.page_state(&path)),
            None => match catch_unwind(AssertUnwindSafe(|| app.page_for(&path))) {
                Ok(pair) => pair,
                Err(panic) => return self.handle_exception(context, panicked(&*panic), None),
            },
        };
        let page_type = (*page).type_name();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.process_page(context, &mut *page, &mut state, depth)
        }));
        let result = match outcome.unwrap_or_else(|panic| Err(panicked(&*panic))) {
            Ok(()) => Ok(()),
            Err(e) => {
                context.clear_registry();
                self.handle_exception(context, e, Some(page_type))
            }
        };

        self.destroy_page(context, &mut *page, &mut state);
        result
    }

    fn process_page(
        &self,
        context: &Context,
        page: &mut dyn Page,
        state: &mut PageState,
        depth: usize,
    ) -> Result<()> {
        let page_name = (*page).type_name();

        trace!("invoked: {}.on_init()", page_name);
        page.on_init(&mut PageCx::new(state, context))?;
        state.controls_mut().init_all(context)?;

        let mut proceed = page.on_security_check(&mut PageCx::new(state, context))?;
        trace!("invoked: {}.on_security_check() : {}", page_name, proceed);

        if proceed && !context.is_forward() {
            let targeted = context.is_ajax_request() && context.registry().has_ajax_targets();
            let outcome = if targeted {
                self.process_ajax_targets(context, page, state)?
            } else if state.controls_mut().process_all(context)? {
                fire_action_events(context, page, state)?
            } else {
                context.registry().clear_action_events();
                FireOutcome {
                    continue_processing: false,
                    ..FireOutcome::default()
                }
            };

            if let Some(partial) = outcome.partial {
                debug!("ajax partial answers {}", state.path());
                let charset = context.charset();
                return partial.write_to(&mut context.response_mut(), &charset);
            }
            if targeted {
                context.response_mut().commit();
                return Ok(());
            }
            proceed = outcome.continue_processing;
        }

        if proceed {
            if context.is_post() {
                trace!("invoked: {}.on_post()", page_name);
                page.on_post(&mut PageCx::new(state, context))?;
            } else {
                trace!("invoked: {}.on_get()", page_name);
                page.on_get(&mut PageCx::new(state, context))?;
            }
            trace!("invoked: {}.on_render()", page_name);
            page.on_render(&mut PageCx::new(state, context))?;
            state.controls_mut().render_all(context)?;
        }

        match state.take_navigation() {
            Navigation::Redirect(location) => {
                let url = absolute_location(&context.context_path(), &location);
                debug!("redirect: {}", url);
                context.response_mut().send_redirect(&url)
            }
            Navigation::Forward(forward) => {
                let limit = context.app().forward_depth_limit();
                let path = forward.path().to_string();
                if depth + 1 > limit {
                    return Err(RequestError::ForwardDepthExceeded { path, limit }.into());
                }
                debug!("forward: {}", path);
                let target = context.forward_to(&path);
                let page = match forward {
                    Forward::Page { page, .. } => Some(page),
                    Forward::Path(_) => None,
                };
                self.dispatch(&target, page, depth + 1)
            }
            Navigation::Render(template) => self.render_template(context, state, &template),
        }
    }

    /// Processes the Ajax targets named by the request parameters, then fires
    /// the queued events.
    fn process_ajax_targets(
        &self,
        context: &Context,
        page: &mut dyn Page,
        state: &mut PageState,
    ) -> Result<FireOutcome> {
        let targets = context.registry().ajax_targets();
        for id in targets {
            let Some(html_id) = state.controls().get(id).and_then(|c| c.html_id()) else {
                continue;
            };
            if !context.has_request_parameter(&html_id) {
                continue;
            }
            trace!("processing ajax target {}", state.controls().display_name(id));
            if !state.controls_mut().process(id, context)? {
                context.registry().clear_action_events();
                return Ok(FireOutcome {
                    continue_processing: false,
                    ..FireOutcome::default()
                });
            }
        }
        fire_action_events(context, page, state)
    }

    /// Destroys the controls and then the page. Never fails.
    fn destroy_page(
        &self,
        context: &Context,
        page: &mut dyn Page,
        state: &mut PageState,
    ) {
        state.controls_mut().destroy_all(context);

        let page_name = (*page).type_name();
        trace!("invoked: {}.on_destroy()", page_name);
        let outcome = catch_unwind(AssertUnwindSafe(|| page.on_destroy(&mut PageCx::new(state, context))));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("error destroying page {}: {}", page_name, e),
            Err(panic) => error!("panic destroying page {}: {}", page_name, panic_message(&*panic)),
        }
    }

    /// Renders the error page for `error` into the response.
    ///
    /// The error page runs without security check or control processing. If
    /// it fails as well the request fails with [`RequestError::DoubleFault`].
    fn handle_exception(
        &self,
        context: &Context,
        error: Error,
        page_type: Option<&'static str>,
    ) -> Result<()> {
        let path = context.resource_path();
        error!("handleException: {} failed for {}: {}", page_type.unwrap_or("page"), path, error);
        ERROR_PAGE_COUNTER
            .with_label_values(&[page_type.unwrap_or("none")])
            .inc();

        let app = context.app().clone();
        let parameters = context.request().parameters().clone();
        let report = ErrorReport::new(&error, &path, page_type, parameters, app.is_production());

        let error_context = context.for_error_page();
        let _scope = error_context.push_thread_local();
        if error_context.response().is_committed() {
            warn!("response already committed, the error page is not rendered");
        } else {
            error_context.response_mut().reset_buffer();
        }

        let (mut page, mut state) = app.error_page(report);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.process_error_page(&error_context, &mut *page, &mut state)
        }));
        let result = outcome.unwrap_or_else(|panic| Err(panicked(&*panic)));
        self.destroy_page(&error_context, &mut *page, &mut state);

        result.map_err(|source| {
            error!("error page failed while handling {}: {}", path, source);
            RequestError::DoubleFault {
                original: error.to_string(),
                source: Box::new(source),
            }
            .into()
        })
    }

    fn process_error_page(
        &self,
        context: &Context,
        page: &mut dyn Page,
        state: &mut PageState,
    ) -> Result<()> {
        page.on_init(&mut PageCx::new(state, context))?;
        state.controls_mut().init_all(context)?;
        if context.is_post() {
            page.on_post(&mut PageCx::new(state, context))?;
        } else {
            page.on_get(&mut PageCx::new(state, context))?;
        }
        page.on_render(&mut PageCx::new(state, context))?;
        state.controls_mut().render_all(context)?;
        let template = state.template().to_string();
        self.render_template(context, state, &template)
    }
}

fn panicked(panic: &(dyn std::any::Any + Send)) -> Error {
    RequestError::Panicked(panic_message(panic)).into()
}
