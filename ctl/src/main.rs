use clap::{Args as ClapArgs, Parser};

use crate::{
    client::{ApiClient, Target},
    commands::Command,
};

mod client;
mod commands;

#[derive(Clone, Debug, ClapArgs)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Address the CA request of this cluster-provider.
    #[clap(short = 'c', long)]
    cluster_provider: Option<String>,

    /// Address the CA request of this project.
    #[clap(short = 'p', long)]
    project: Option<String>,
}

impl TargetArgs {
    fn target(self) -> anyhow::Result<Target> {
        match (self.cluster_provider, self.project) {
            (Some(cp), None) => Ok(Target::ClusterProvider(cp)),
            (None, Some(project)) => Ok(Target::Project(project)),
            _ => anyhow::bail!("exactly one of --cluster-provider or --project is required"),
        }
    }
}

#[derive(Parser)]
#[command(name = "certmeshctl", version)]
pub struct Args {
    #[clap(subcommand)]
    command: Command,

    #[clap(flatten)]
    target: TargetArgs,

    #[clap(
        short = 'u',
        long,
        env = "CERTMESH_API_URL",
        default_value = "http://localhost:4000"
    )]
    api_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let client = ApiClient::new(args.api_url)?;
    commands::run(&client, args.target.target()?, args.command).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cluster_provider_create() {
        let args = Args::try_parse_from([
            "certmeshctl",
            "--cluster-provider",
            "cp1",
            "create",
            "-m",
            "c1",
            "-m",
            "c2",
            "--issuing-cluster",
            "hub",
        ])
        .unwrap();

        assert_eq!(
            args.target.target().unwrap(),
            Target::ClusterProvider("cp1".into())
        );
        match args.command {
            Command::Create { members, issuing_cluster, .. } => {
                assert_eq!(members, vec!["c1", "c2"]);
                assert_eq!(issuing_cluster, "hub");
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn scope_flags_are_exclusive_and_required() {
        assert!(Args::try_parse_from(["certmeshctl", "-c", "cp1", "-p", "p1", "get"]).is_err());
        assert!(Args::try_parse_from(["certmeshctl", "get"]).is_err());
    }

    #[test]
    fn phase_must_be_known() {
        assert!(Args::try_parse_from(["certmeshctl", "-p", "p1", "status", "issuance"]).is_err());
        assert!(Args::try_parse_from(["certmeshctl", "-p", "p1", "status", "enrollment"]).is_ok());
    }
}
