//! Kubernetes resource watchers.
//!
//! Runs `kube_runtime::Controller` over WebApps and the four resource kinds
//! they own. Any change to a WebApp or to an owned object triggers a pass for
//! that WebApp; the runtime never runs two passes for the same object at once.

use crate::backoff::BackoffRegistry;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::server::ServerState;
use crds::{Certificate, WebApp};
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Api, Client, Resource};
use kube_runtime::{
    Controller, watcher,
    controller::{Action, Config as RuntimeConfig},
};
use resource_store::ObjectKey;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconciliation
pub struct Context {
    pub reconciler: Reconciler,
    /// Cancelled once the watcher has stopped; each pass runs on a child token
    pub shutdown: CancellationToken,
    pub reconcile_timeout: Duration,
    pub backoffs: BackoffRegistry,
}

impl Context {
    pub fn new(reconciler: Reconciler, config: &ControllerConfig, shutdown: CancellationToken) -> Self {
        Self {
            reconciler,
            shutdown,
            reconcile_timeout: config.reconcile_timeout,
            backoffs: BackoffRegistry::new(config.error_backoff_min, config.error_backoff_max),
        }
    }
}

pub(crate) fn to_action(outcome: ReconcileOutcome) -> Action {
    match outcome {
        ReconcileOutcome::Converged => Action::await_change(),
        ReconcileOutcome::RequeueAfter(delay) => Action::requeue(delay),
    }
}

/// One reconciliation pass, bounded by the configured deadline
pub(crate) async fn reconcile(web_app: Arc<WebApp>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ObjectKey::from_resource(web_app.as_ref()).ok_or_else(|| {
        ControllerError::InvalidObject("WebApp without name or namespace".to_string())
    })?;

    debug!(webapp = %key, "Reconciling WebApp");
    metrics::increment_reconciliations();
    let started = Instant::now();

    let pass = ctx.shutdown.child_token();
    let deadline = tokio::spawn({
        let pass = pass.clone();
        let timeout = ctx.reconcile_timeout;
        async move {
            tokio::time::sleep(timeout).await;
            pass.cancel();
        }
    });
    let result = ctx.reconciler.reconcile(&key, &pass).await;
    deadline.abort();

    metrics::observe_reconciliation_duration(started.elapsed().as_secs_f64());

    match result {
        Ok(outcome) => {
            ctx.backoffs.reset(&key);
            if matches!(outcome, ReconcileOutcome::RequeueAfter(_)) {
                metrics::increment_certificate_pending();
            }
            Ok(to_action(outcome))
        }
        Err(e) => {
            metrics::increment_reconciliation_errors(e.step());
            Err(e.into())
        }
    }
}

/// Requeue failed WebApps with a per-object Fibonacci backoff
///
/// A pass cut short by shutdown is not a failure of the WebApp and leaves its
/// backoff untouched.
pub(crate) fn error_policy(web_app: Arc<WebApp>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    if ctx.shutdown.is_cancelled() {
        info!("Reconciliation interrupted by shutdown: {}", error);
        return Action::await_change();
    }
    match ObjectKey::from_resource(web_app.as_ref()) {
        Some(key) => {
            let delay = ctx.backoffs.next_backoff(&key);
            error!(webapp = %key, "Reconciliation failed, retrying in {:?}: {}", delay, error);
            Action::requeue(delay)
        }
        None => {
            error!("Reconciliation failed for unidentifiable WebApp: {}", error);
            Action::await_change()
        }
    }
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + Debug + DeserializeOwned,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watch WebApps and their owned resources until the process is signalled
pub async fn watch_web_apps(
    client: Client,
    config: ControllerConfig,
    ctx: Arc<Context>,
    state: Arc<ServerState>,
) -> Result<(), ControllerError> {
    let namespace = config.namespace.as_deref();
    info!(
        "Starting WebApp watcher ({})",
        namespace.unwrap_or("all namespaces")
    );

    let runtime_config = RuntimeConfig::default().concurrency(config.max_concurrent_reconciles);

    let controller = Controller::new(scoped_api::<WebApp>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<Certificate>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<Deployment>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<Service>(&client, namespace), watcher::Config::default())
        .owns(scoped_api::<Ingress>(&client, namespace), watcher::Config::default())
        .with_config(runtime_config)
        .shutdown_on_signal();

    state.mark_ready();

    controller
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled WebApp {}", obj),
                Err(e) => warn!("WebApp controller error: {}", e),
            }
        })
        .await;

    info!("WebApp watcher stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ReconcileError, ReconcileStep};
    use crate::reconciler::CERTIFICATE_WAIT;
    use crate::test_utils::*;
    use resource_store::{MockResourceStore, StoreError, StoreOperation};

    fn context(store: &MockResourceStore, timeout: Duration) -> Arc<Context> {
        let config = ControllerConfig {
            reconcile_timeout: timeout,
            ..Default::default()
        };
        Arc::new(Context::new(
            create_test_reconciler(store),
            &config,
            CancellationToken::new(),
        ))
    }

    #[test]
    fn test_outcome_to_action() {
        assert_eq!(to_action(ReconcileOutcome::Converged), Action::await_change());
        assert_eq!(
            to_action(ReconcileOutcome::RequeueAfter(CERTIFICATE_WAIT)),
            Action::requeue(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn test_pending_certificate_requeues() {
        let store = MockResourceStore::new();
        let web_app = create_test_blog();
        store.insert_web_app(web_app.clone());
        let ctx = context(&store, Duration::from_secs(30));

        let action = reconcile(Arc::new(web_app), ctx).await.unwrap();
        assert_eq!(action, Action::requeue(CERTIFICATE_WAIT));
    }

    #[tokio::test]
    async fn test_deadline_cancels_the_pass() {
        let store = MockResourceStore::new();
        let web_app = create_test_blog();
        store.insert_web_app(web_app.clone());
        store.hang_on(StoreOperation::ApplyService);
        let ctx = context(&store, Duration::from_millis(20));

        let err = reconcile(Arc::new(web_app), ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Reconcile(ReconcileError::Cancelled { step: ReconcileStep::ApplyService })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_the_pass() {
        let store = MockResourceStore::new();
        let web_app = create_test_blog();
        store.insert_web_app(web_app.clone());
        let ctx = context(&store, Duration::from_secs(30));
        ctx.shutdown.cancel();

        let err = reconcile(Arc::new(web_app), ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Reconcile(ReconcileError::Cancelled { step: ReconcileStep::FetchWebApp })
        ));
    }

    #[tokio::test]
    async fn test_error_policy_backs_off_until_success() {
        let store = MockResourceStore::new();
        let web_app = Arc::new(create_test_blog());
        store.insert_web_app(create_test_blog());
        let ctx = context(&store, Duration::from_secs(30));
        let minutes = |m: u64| Action::requeue(Duration::from_secs(m * 60));

        for expected in [minutes(1), minutes(1), minutes(2)] {
            store.fail_next(StoreOperation::GetWebApp, StoreError::Unavailable("down".to_string()));
            let err = reconcile(web_app.clone(), ctx.clone()).await.unwrap_err();
            assert_eq!(error_policy(web_app.clone(), &err, ctx.clone()), expected);
        }

        reconcile(web_app.clone(), ctx.clone()).await.unwrap();

        store.fail_next(StoreOperation::GetWebApp, StoreError::Unavailable("down".to_string()));
        let err = reconcile(web_app.clone(), ctx.clone()).await.unwrap_err();
        assert_eq!(error_policy(web_app, &err, ctx), minutes(1));
    }

    #[tokio::test]
    async fn test_shutdown_does_not_count_as_failure() {
        let store = MockResourceStore::new();
        let web_app = Arc::new(create_test_blog());
        store.insert_web_app(create_test_blog());
        let shutdown = CancellationToken::new();
        let ctx = Arc::new(Context::new(
            create_test_reconciler(&store),
            &ControllerConfig::default(),
            shutdown.clone(),
        ));

        shutdown.cancel();
        let err = reconcile(web_app.clone(), ctx.clone()).await.unwrap_err();
        assert_eq!(error_policy(web_app.clone(), &err, ctx.clone()), Action::await_change());

        // The interrupted pass left no backoff behind
        let ctx = Arc::new(Context {
            shutdown: CancellationToken::new(),
            ..Arc::into_inner(ctx).unwrap()
        });
        store.fail_next(StoreOperation::GetWebApp, StoreError::Unavailable("down".to_string()));
        let err = reconcile(web_app.clone(), ctx.clone()).await.unwrap_err();
        assert_eq!(error_policy(web_app, &err, ctx), Action::requeue(Duration::from_secs(60)));
    }
}
