use anyhow::{Context, bail};
use certmesh_common::{
    params::{Phase, PhaseAction},
    views::IssuingCluster,
};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;

use crate::client::{ApiClient, Target};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Enrollment,
    Distribution,
}

impl From<PhaseArg> for Phase {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::Enrollment => Phase::Enrollment,
            PhaseArg::Distribution => Phase::Distribution,
        }
    }
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Request a CA certificate and attach the given members to it.
    Create {
        /// Member to attach. Repeat for several members.
        #[clap(short, long = "member")]
        members: Vec<String>,

        /// Cluster that issues the CA certificate.
        #[clap(long)]
        issuing_cluster: String,

        /// Cluster-provider of the issuing cluster. Defaults to the
        /// cluster-provider being targeted.
        #[clap(long)]
        issuing_cluster_provider: Option<String>,
    },

    /// Show the CA intent.
    Get,

    /// Terminate and delete the CA intent with all its members.
    Delete,

    /// List the attached members.
    Members,

    /// Replace the attached members with exactly the ones given.
    #[command(name = "set-members")]
    SetMembers { members: Vec<String> },

    /// Show the status of a phase.
    Status {
        #[clap(value_enum)]
        phase: PhaseArg,
    },

    /// Instantiate a single phase.
    Instantiate {
        #[clap(value_enum)]
        phase: PhaseArg,
    },

    /// Terminate a single phase.
    Terminate {
        #[clap(value_enum)]
        phase: PhaseArg,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to render response")?;
    println!("{json}");
    Ok(())
}

pub async fn run(client: &ApiClient, target: Target, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Create {
            members,
            issuing_cluster,
            issuing_cluster_provider,
        } => {
            let cluster_provider = match (issuing_cluster_provider, &target) {
                (Some(cp), _) => cp,
                (None, Target::ClusterProvider(cp)) => cp.clone(),
                (None, Target::Project(_)) => {
                    bail!("--issuing-cluster-provider is required for a project")
                }
            };

            let created = client
                .create(
                    &target,
                    members,
                    IssuingCluster {
                        cluster: issuing_cluster,
                        cluster_provider,
                    },
                )
                .await?;
            print_json(&created)
        }
        Command::Get => print_json(&client.get(&target).await?),
        Command::Delete => {
            let intent = client.delete(&target).await?;
            println!("Deleted {intent}");
            Ok(())
        }
        Command::Members => {
            for member in client.members(&target).await?.members {
                println!("{member}");
            }
            Ok(())
        }
        Command::SetMembers { members } => print_json(&client.set_members(&target, members).await?),
        Command::Status { phase } => {
            print_json(&client.phase_status(&target, phase.into()).await?)
        }
        Command::Instantiate { phase } => {
            let message = client
                .phase_action(&target, phase.into(), PhaseAction::Instantiate)
                .await?;
            println!("{message}");
            Ok(())
        }
        Command::Terminate { phase } => {
            let message = client
                .phase_action(&target, phase.into(), PhaseAction::Terminate)
                .await?;
            println!("{message}");
            Ok(())
        }
    }
}
