use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use recat_core::{count_will_change, filter_will_change, BatchResult, Document, MutationRequest};
use recat_engine::{
    enumerate_documents, BatchEngine, BatchOptions, HttpDocumentStore, MutationGateway,
    ProgressSink, RateBudget, StoreError, StoreSettings,
};
use recat_logging::{engine_error, engine_info, engine_warn, LogDestination};
use url::Url;

use super::plan::{load_plan, RunPlan};
use super::report::save_report;

pub fn run_app() -> ExitCode {
    recat_logging::initialize(LogDestination::Both(PathBuf::from("./recat.log")));

    let Some(plan_path) = std::env::args().nth(1) else {
        eprintln!("usage: recat_app <plan.ron>");
        return ExitCode::FAILURE;
    };

    let plan = match load_plan(Path::new(&plan_path)) {
        Ok(plan) => plan,
        Err(err) => {
            engine_error!("Failed to load plan {:?}: {}", plan_path, err);
            return ExitCode::FAILURE;
        }
    };

    let request = match MutationRequest::new(plan.add.clone(), plan.remove.clone()) {
        Ok(request) => request,
        Err(err) => {
            engine_error!("Invalid plan: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if request.is_empty() {
        engine_warn!("Plan has no categories to add or remove; nothing to do");
        return ExitCode::SUCCESS;
    }

    let endpoint = match Url::parse(&plan.endpoint) {
        Ok(endpoint) => endpoint,
        Err(err) => {
            engine_error!("Invalid endpoint {:?}: {}", plan.endpoint, err);
            return ExitCode::FAILURE;
        }
    };
    let store = match HttpDocumentStore::new(endpoint, StoreSettings::default()) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            engine_error!("Failed to build document store: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            engine_error!("Failed to start runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run_plan(plan, request, store))
}

async fn run_plan(
    plan: RunPlan,
    request: MutationRequest,
    store: Arc<HttpDocumentStore>,
) -> ExitCode {
    let (mut documents, read_failures) = enumerate_documents(store.as_ref(), &plan.titles).await;
    for document in &mut documents {
        document.selected = !plan.skip.iter().any(|skip| skip == &document.title);
    }
    documents.retain(|document| document.selected);

    let changing = count_will_change(&documents, &request);
    engine_info!(
        "{} of {} selected documents will change",
        changing,
        documents.len()
    );
    if changing == 0 && read_failures.is_empty() {
        println!("Nothing to do.");
        return ExitCode::SUCCESS;
    }

    let candidates = filter_will_change(&documents, &request);
    let gateway = MutationGateway::new(store.clone());
    let mut engine = BatchEngine::new(
        gateway,
        store,
        RateBudget::default(),
        BatchOptions {
            retry_on_rate_limit: plan.retry_on_rate_limit,
        },
    );

    let result = engine.run(candidates, &request, &ConsoleSink).await;

    println!("{}", result.summary_line());
    save_report(Path::new("."), &result);

    if result.failed() > 0 || !read_failures.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn on_progress(&self, percent: f64, snapshot: &BatchResult) {
        engine_info!("Progress {:.0}%: {}", percent, snapshot.summary_line());
    }

    fn on_file_complete(&self, document: &Document, succeeded: bool) {
        if succeeded {
            engine_info!("Updated {:?}", document.title);
        } else {
            engine_info!("Unchanged {:?}", document.title);
        }
    }

    fn on_error(&self, document: &Document, error: &StoreError) {
        engine_warn!("Failed {:?}: {}", document.title, error);
    }
}
