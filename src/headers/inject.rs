//! Middleware to add headers read from the environment to requests and responses.

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::env::{Environment, ProcessEnvironment};
use crate::error::{Direction, InvalidConfiguration};

use super::resolve::{resolve_all, ResolvedHeader};

struct Resolved {
    name: Arc<str>,
    request: Vec<ResolvedHeader>,
    response: Vec<ResolvedHeader>,
}

impl Resolved {
    fn new<E>(name: &str, config: &Config, env: &E) -> Result<Self, InvalidConfiguration>
    where
        E: Environment + ?Sized,
    {
        let span = tracing::debug_span!("env_headers", middleware = name);
        let _guard = span.enter();

        let request = resolve_all(
            Direction::Request,
            &config.request_headers,
            config.optional_unset,
            env,
        )?;
        let response = resolve_all(
            Direction::Response,
            &config.response_headers,
            config.optional_unset,
            env,
        )?;

        tracing::debug!(
            request = request.len(),
            response = response.len(),
            "Environment headers ready"
        );

        Ok(Self {
            name: name.into(),
            request,
            response,
        })
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values come from the environment and may be secrets.
        let names = |headers: &[ResolvedHeader]| {
            headers
                .iter()
                .map(|h| h.name().clone())
                .collect::<Vec<_>>()
        };

        f.debug_struct("Resolved")
            .field("name", &self.name)
            .field("request", &names(&self.request))
            .field("response", &names(&self.response))
            .finish()
    }
}

/// Layer to add headers read from the environment.
///
/// The environment is read once, when the layer is created. Later changes to
/// the environment are not observed.
#[derive(Debug, Clone)]
pub struct EnvHeaderLayer {
    resolved: Arc<Resolved>,
}

impl EnvHeaderLayer {
    /// Create a new `EnvHeaderLayer`, reading from the process environment.
    ///
    /// The `name` identifies this instance in logs.
    pub fn new(name: impl AsRef<str>, config: &Config) -> Result<Self, InvalidConfiguration> {
        Self::with_environment(name, config, &ProcessEnvironment)
    }

    /// Create a new `EnvHeaderLayer`, reading from the given environment.
    pub fn with_environment<E>(
        name: impl AsRef<str>,
        config: &Config,
        env: &E,
    ) -> Result<Self, InvalidConfiguration>
    where
        E: Environment + ?Sized,
    {
        Ok(Self {
            resolved: Arc::new(Resolved::new(name.as_ref(), config, env)?),
        })
    }

    /// The name of this instance.
    pub fn name(&self) -> &str {
        &self.resolved.name
    }

    /// Headers added to each request, in order.
    pub fn request_headers(&self) -> &[ResolvedHeader] {
        &self.resolved.request
    }

    /// Headers added to each response, in order.
    pub fn response_headers(&self) -> &[ResolvedHeader] {
        &self.resolved.response
    }
}

impl<S> tower::layer::Layer<S> for EnvHeaderLayer {
    type Service = EnvHeader<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EnvHeader {
            inner,
            resolved: self.resolved.clone(),
        }
    }
}

/// Middleware to add headers read from the environment.
///
/// Request headers are appended before the inner service is called, response
/// headers once it returns a response. Existing headers are never replaced.
#[derive(Debug, Clone)]
pub struct EnvHeader<S> {
    inner: S,
    resolved: Arc<Resolved>,
}

impl<S> EnvHeader<S> {
    /// Create a new `EnvHeader` middleware, reading from the process environment.
    pub fn new(
        inner: S,
        config: &Config,
        name: impl AsRef<str>,
    ) -> Result<Self, InvalidConfiguration> {
        Self::with_environment(inner, config, name, &ProcessEnvironment)
    }

    /// Create a new `EnvHeader` middleware, reading from the given environment.
    pub fn with_environment<E>(
        inner: S,
        config: &Config,
        name: impl AsRef<str>,
        env: &E,
    ) -> Result<Self, InvalidConfiguration>
    where
        E: Environment + ?Sized,
    {
        let layer = EnvHeaderLayer::with_environment(name, config, env)?;
        Ok(tower::layer::Layer::layer(&layer, inner))
    }

    /// The name of this instance.
    pub fn name(&self) -> &str {
        &self.resolved.name
    }

    /// Get a reference to the inner service.
    pub fn service(&self) -> &S {
        &self.inner
    }

    /// Unwrap the inner service
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, BIn, BOut> tower::Service<http::Request<BIn>> for EnvHeader<S>
where
    S: tower::Service<http::Request<BIn>, Response = http::Response<BOut>>,
{
    type Response = http::Response<BOut>;
    type Error = S::Error;
    type Future = self::future::EnvHeaderFuture<S::Future>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<BIn>) -> Self::Future {
        for header in &self.resolved.request {
            header.append_to(req.headers_mut());
        }
        tracing::trace!(
            middleware = %self.resolved.name,
            count = self.resolved.request.len(),
            "Added request headers"
        );

        self::future::EnvHeaderFuture::new(self.inner.call(req), self.resolved.clone())
    }
}

mod future {
    use std::sync::Arc;
    use std::task::ready;

    use pin_project_lite::pin_project;

    use super::Resolved;

    pin_project! {
        #[derive(Debug)]
        pub struct EnvHeaderFuture<F> {
            #[pin]
            inner: F,
            resolved: Arc<Resolved>,
        }
    }

    impl<F> EnvHeaderFuture<F> {
        pub(super) fn new(inner: F, resolved: Arc<Resolved>) -> Self {
            Self { inner, resolved }
        }
    }

    impl<F, BOut, E> std::future::Future for EnvHeaderFuture<F>
    where
        F: std::future::Future<Output = Result<http::Response<BOut>, E>>,
    {
        type Output = Result<http::Response<BOut>, E>;

        fn poll(
            self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Self::Output> {
            let this = self.project();
            let mut res = ready!(this.inner.poll(cx));

            if let Ok(response) = &mut res {
                for header in &this.resolved.response {
                    header.append_to(response.headers_mut());
                }
                tracing::trace!(
                    middleware = %this.resolved.name,
                    count = this.resolved.response.len(),
                    "Added response headers"
                );
            }

            std::task::Poll::Ready(res)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::convert::Infallible;

    use tower::{Layer as _, Service as _, ServiceExt as _};

    use crate::config::{HeaderMapping, OptionalUnset};
    use crate::error::Reason;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn echo_request_headers(
        request: http::Request<()>,
    ) -> Result<http::Response<()>, Infallible> {
        let mut response = http::Response::new(());
        *response.headers_mut() = request.headers().clone();
        Ok(response)
    }

    #[tokio::test]
    async fn adds_request_header() {
        let config =
            Config::new().request_header(HeaderMapping::required("Test-Header", "TEST_ENV"));
        let layer = EnvHeaderLayer::with_environment(
            "environmentheader",
            &config,
            &env(&[("TEST_ENV", "FOO BAR")]),
        )
        .unwrap();

        let service = layer.layer(tower::service_fn(|request: http::Request<()>| async move {
            assert_eq!(request.headers().get("Test-Header").unwrap(), "FOO BAR");
            Ok::<_, Infallible>(http::Response::new(()))
        }));

        let request = http::Request::get("http://test").body(()).unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert!(response.headers().get("Test-Header").is_none());
    }

    #[tokio::test]
    async fn adds_response_header() {
        let config =
            Config::new().response_header(HeaderMapping::required("Test-Header", "TEST_ENV"));
        let layer = EnvHeaderLayer::with_environment(
            "environmentheader",
            &config,
            &env(&[("TEST_ENV", "FOO")]),
        )
        .unwrap();

        let service = layer.layer(tower::service_fn(echo_request_headers));

        let request = http::Request::get("http://test").body(()).unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.headers().get("Test-Header").unwrap(), "FOO");
    }

    #[tokio::test]
    async fn appends_to_existing_headers() {
        let config = Config::new()
            .request_header(HeaderMapping::required("X-Dup", "FIRST"))
            .request_header(HeaderMapping::required("X-Dup", "SECOND"))
            .response_header(HeaderMapping::required("X-Dup", "THIRD"));
        let layer = EnvHeaderLayer::with_environment(
            "dup",
            &config,
            &env(&[("FIRST", "1"), ("SECOND", "2"), ("THIRD", "3")]),
        )
        .unwrap();

        let service = layer.layer(tower::service_fn(echo_request_headers));

        let request = http::Request::get("http://test")
            .header("X-Dup", "0")
            .body(())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        let values: Vec<_> = response.headers().get_all("X-Dup").iter().collect();
        assert_eq!(values, ["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn optional_unset_skipped() {
        let config = Config::new()
            .request_header(HeaderMapping::optional("X-Region", "REGION"))
            .response_header(HeaderMapping::optional("X-Region", "REGION"));
        let layer = EnvHeaderLayer::with_environment("optional", &config, &env(&[])).unwrap();

        assert!(layer.request_headers().is_empty());
        assert!(layer.response_headers().is_empty());

        let service = layer.layer(tower::service_fn(echo_request_headers));
        let response = service.oneshot(http::Request::new(())).await.unwrap();

        assert!(response.headers().get("X-Region").is_none());
    }

    #[tokio::test]
    async fn optional_unset_empty() {
        let config = Config::new()
            .request_header(HeaderMapping::optional("X-Region", "REGION"))
            .optional_unset(OptionalUnset::Empty);
        let layer = EnvHeaderLayer::with_environment("optional", &config, &env(&[])).unwrap();

        let service = layer.layer(tower::service_fn(echo_request_headers));
        let response = service.oneshot(http::Request::new(())).await.unwrap();

        assert_eq!(response.headers().get("X-Region").unwrap(), "");
    }

    #[test]
    fn required_unset_fails() {
        let config =
            Config::new().request_header(HeaderMapping::required("Test-Header", "TEST_ENV"));

        let error = EnvHeaderLayer::with_environment("required", &config, &env(&[])).unwrap_err();

        assert_eq!(error.direction(), Direction::Request);
        assert_eq!(
            error.reason(),
            &Reason::RequiredEnvUnset {
                env: "TEST_ENV".into()
            }
        );
    }

    #[test]
    fn missing_header_name_fails() {
        let config: Config =
            serde_json::from_str(r#"{"requestHeaders": [{"header": "", "env": "X"}]}"#).unwrap();

        let error = EnvHeaderLayer::with_environment("empty", &config, &env(&[("X", "x")]))
            .unwrap_err();

        assert_eq!(error.reason(), &Reason::MissingHeaderName);
    }

    #[test]
    fn response_errors_after_request_headers() {
        let config = Config::new()
            .request_header(HeaderMapping::required("X-Ok", "OK"))
            .response_header(HeaderMapping::required("Bad Header", "OK"));

        let error = EnvHeaderLayer::with_environment("bad", &config, &env(&[("OK", "1")]))
            .unwrap_err();

        assert_eq!(error.direction(), Direction::Response);
        assert!(matches!(error.reason(), Reason::InvalidHeaderName(_)));
    }

    #[test]
    fn resolved_once() {
        let config = Config::new().request_header(HeaderMapping::required("X-Value", "VALUE"));
        let mut vars = env(&[("VALUE", "before")]);

        let layer = EnvHeaderLayer::with_environment("once", &config, &vars).unwrap();
        vars.insert("VALUE".into(), "after".into());

        assert_eq!(layer.request_headers()[0].value(), "before");
    }

    #[test]
    fn debug_hides_values() {
        let config = Config::new().request_header(HeaderMapping::required("X-Token", "TOKEN"));
        let layer =
            EnvHeaderLayer::with_environment("secret", &config, &env(&[("TOKEN", "hunter2")]))
                .unwrap();

        let debug = format!("{:?}", layer);
        assert!(debug.contains("x-token"));
        assert!(debug.contains("secret"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let config = Config::new().response_header(HeaderMapping::required("X-Value", "VALUE"));
        let layer =
            EnvHeaderLayer::with_environment("errors", &config, &env(&[("VALUE", "v")])).unwrap();

        let service = layer.layer(tower::service_fn(|_: http::Request<()>| async {
            Err::<http::Response<()>, _>("upstream failed")
        }));

        let error = service.oneshot(http::Request::new(())).await.unwrap_err();
        assert_eq!(error, "upstream failed");
    }

    #[tokio::test]
    async fn cloned_services_share_headers() {
        let config = Config::new().response_header(HeaderMapping::required("X-Value", "VALUE"));
        let layer =
            EnvHeaderLayer::with_environment("shared", &config, &env(&[("VALUE", "v")])).unwrap();

        let mut service = layer.layer(tower::service_fn(echo_request_headers));
        let mut other = service.clone();

        let first = service
            .ready()
            .await
            .unwrap()
            .call(http::Request::new(()))
            .await
            .unwrap();
        let second = other
            .ready()
            .await
            .unwrap()
            .call(http::Request::new(()))
            .await
            .unwrap();

        assert_eq!(first.headers().get("X-Value").unwrap(), "v");
        assert_eq!(second.headers().get("X-Value").unwrap(), "v");
        assert_eq!(service.name(), "shared");
    }

    #[tokio::test]
    async fn process_environment() {
        let name = "HYENV_INJECT_PROCESS_ENVIRONMENT_TEST";
        std::env::set_var(name, "from-process");

        let config = Config::new().request_header(HeaderMapping::required("X-Process", name));
        let service = EnvHeader::new(
            tower::service_fn(echo_request_headers),
            &config,
            "process",
        )
        .unwrap();
        std::env::remove_var(name);

        let response = service.oneshot(http::Request::new(())).await.unwrap();
        assert_eq!(response.headers().get("X-Process").unwrap(), "from-process");
    }

    #[tokio::test]
    async fn service_with_environment() {
        let config = Config::new()
            .request_header(HeaderMapping::required("X-Request", "REQUEST"))
            .response_header(HeaderMapping::required("X-Response", "RESPONSE"));
        let service = EnvHeader::with_environment(
            tower::service_fn(echo_request_headers),
            &config,
            "injected",
            &env(&[("REQUEST", "req"), ("RESPONSE", "res")]),
        )
        .unwrap();
        assert_eq!(service.name(), "injected");

        let response = service.oneshot(http::Request::new(())).await.unwrap();
        assert_eq!(response.headers().get("X-Request").unwrap(), "req");
        assert_eq!(response.headers().get("X-Response").unwrap(), "res");

        let error = EnvHeader::with_environment(
            tower::service_fn(echo_request_headers),
            &config,
            "injected",
            &env(&[("REQUEST", "req")]),
        )
        .unwrap_err();
        assert_eq!(error.direction(), Direction::Response);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_environment_non_utf8_value() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt as _;

        let name = "HYENV_INJECT_NON_UTF8_TEST";
        std::env::set_var(name, OsString::from_vec(b"caf\xe9".to_vec()));

        let config = Config::new().response_header(HeaderMapping::required("X-Raw", name));
        let layer = EnvHeaderLayer::new("raw", &config);
        std::env::remove_var(name);
        let layer = layer.unwrap();

        assert_eq!(layer.response_headers()[0].value().as_bytes(), b"caf\xe9");

        let service = layer.layer(tower::service_fn(echo_request_headers));
        let response = service.oneshot(http::Request::new(())).await.unwrap();
        assert_eq!(response.headers().get("X-Raw").unwrap().as_bytes(), b"caf\xe9");
    }
}
