//! `runway inventory` - read-only listing of InferenceServices and runtimes

use clap::{ArgGroup, Args};

use runway_common::DEFAULT_TEMPLATE_NAMESPACE;
use runway_migrate::{scan_inventory, InventoryRow, KubeAccessor, NamespaceScope, ObjectAccessor};

use super::format::{or_dash, print_json, print_table, OutputFormat};
use super::kube_client;
use crate::{GlobalArgs, Result};

/// List InferenceServices and the state of their runtimes
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("scope").required(true).args(["namespace", "all_namespaces"])))]
pub struct InventoryArgs {
    /// Namespace to list
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// List every namespace
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Namespace holding the runtime templates
    #[arg(long, env = "RUNWAY_TEMPLATE_NAMESPACE", default_value = DEFAULT_TEMPLATE_NAMESPACE)]
    pub template_namespace: String,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub output: OutputFormat,
}

impl InventoryArgs {
    fn scope(&self) -> NamespaceScope {
        match &self.namespace {
            Some(ns) if !self.all_namespaces => NamespaceScope::Namespace(ns.clone()),
            _ => NamespaceScope::All,
        }
    }
}

/// Run the inventory command
pub async fn run(args: InventoryArgs, global: &GlobalArgs) -> Result<()> {
    let client = kube_client(global.kubeconfig.as_deref()).await?;
    let accessor = KubeAccessor::new(client);
    let scope = args.scope();

    match &scope {
        NamespaceScope::Namespace(ns) => {
            runway_migrate::prereq::check_prerequisites(
                &accessor,
                ns,
                Some(&args.template_namespace),
            )
            .await?
        }
        NamespaceScope::All => accessor.check_access().await.map_err(|e| {
            runway_common::Error::prerequisite(format!("cannot access the cluster: {}", e))
        })?,
    }

    let rows = scan_inventory(&accessor, &scope, &args.template_namespace).await?;

    match args.output {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => {
            let show_namespace = scope == NamespaceScope::All;
            let (headers, table) = table_rows(&rows, show_namespace);
            print_table(&headers, &table);
        }
    }
    Ok(())
}

fn table_rows(
    rows: &[InventoryRow],
    show_namespace: bool,
) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let mut headers = vec![
        "NAME", "PATH", "RUNTIME", "SCOPE", "TEMPLATE", "CURRENT", "TARGET", "STATUS",
    ];
    if show_namespace {
        headers.insert(0, "NAMESPACE");
    }

    let table = rows
        .iter()
        .map(|row| {
            let mut cells = vec![
                row.name.clone(),
                or_dash(row.binding_path.map(|p| match p {
                    runway_migrate::BindingPath::ModelScoped => "model",
                    runway_migrate::BindingPath::PredictorScoped => "predictor",
                })),
                or_dash(row.runtime.as_deref()),
                or_dash(row.scope),
                or_dash(row.template.as_deref()),
                or_dash(row.current_version.as_deref()),
                or_dash(row.target_version.as_deref()),
                row.status.to_string(),
            ];
            if show_namespace {
                cells.insert(0, row.namespace.clone());
            }
            cells
        })
        .collect();

    (headers, table)
}
