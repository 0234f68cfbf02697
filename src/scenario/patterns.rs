//! Builders for the log signatures the cluster emits.
//!
//! Provisioning barriers and scenario verification watch for the same lines,
//! so every regex is produced here from node identity plus the configured
//! service names. Lines arrive through the control host's aggregated syslog;
//! each pattern therefore begins with the emitting node's hostname.

use crate::config::ClusterConfig;

/// Announce line the coordinator logs once its product service is serving.
pub fn coordinator_ready(
    cluster: &ClusterConfig,
    coordinator_host: &str,
) -> String {
    format!(
        " {coordinator_host} {svc} INFO: Coordinator version .* operational",
        svc = cluster.coordinator_service
    )
}

/// Shutdown notice the coordinator logs when its product service stops.
pub fn coordinator_stopping(
    cluster: &ClusterConfig,
    coordinator_host: &str,
) -> String {
    format!(
        " {coordinator_host} {svc} INFO: Coordinator shutting down",
        svc = cluster.coordinator_service
    )
}

/// Agent-side connect notice.
pub fn agent_connected(
    cluster: &ClusterConfig,
    agent_host: &str,
) -> String {
    format!(
        r" {agent_host} {svc}\[.*]: NOTICE: Connected to coordinator\.",
        svc = cluster.agent_service
    )
}

/// Coordinator-side registration record for one agent.
pub fn agent_registered(
    cluster: &ClusterConfig,
    coordinator_host: &str,
    agent_host: &str,
    agent_ip: &str,
) -> String {
    format!(
        r" {coordinator_host} {svc} INFO: Agent {agent_host} registered from address \[::ffff:{agent_ip}]",
        svc = cluster.coordinator_service
    )
}

/// Coordinator-side confirmation that an agent's first discovery data landed
/// in the graph.
pub fn discovery_processed(
    cluster: &ClusterConfig,
    coordinator_host: &str,
    agent_host: &str,
) -> String {
    format!(
        r" {coordinator_host} {svc} INFO: Processed discovery data from {agent_host} into graph\.",
        svc = cluster.coordinator_service
    )
}

/// The full readiness signature of one freshly spawned agent: connected,
/// registered, and first discovery processed.
pub fn agent_ready(
    cluster: &ClusterConfig,
    coordinator_host: &str,
    agent_host: &str,
    agent_ip: &str,
) -> Vec<String> {
    vec![
        agent_connected(cluster, agent_host),
        agent_registered(cluster, coordinator_host, agent_host, agent_ip),
        discovery_processed(cluster, coordinator_host, agent_host),
    ]
}

/// Coordinator-side record of an agent announcing a graceful shutdown.
pub fn graceful_shutdown(
    cluster: &ClusterConfig,
    coordinator_host: &str,
    agent_host: &str,
    agent_ip: &str,
) -> String {
    format!(
        r"{coordinator_host} {svc} INFO: System {agent_host} at \[::ffff:{agent_ip}]:{port} reports graceful shutdown",
        svc = cluster.coordinator_service,
        port = cluster.coordinator_port
    )
}

/// Coordinator-side notice that monitoring of a discovered service began.
pub fn monitoring_activated(
    cluster: &ClusterConfig,
    coordinator_host: &str,
    agent_host: &str,
    service: &str,
) -> String {
    format!(
        " {coordinator_host} {svc} INFO: Monitoring of {service} activated on {agent_host}",
        svc = cluster.coordinator_service
    )
}

/// Agent-side notice that a locally managed service is serving.
pub fn service_operational(
    cluster: &ClusterConfig,
    agent_host: &str,
    service: &str,
) -> String {
    format!(
        r" {agent_host} {svc}\[.*]: NOTICE: Service {service} operational",
        svc = cluster.agent_service
    )
}

/// Any error-severity line, regardless of emitter. The CLI arms this around
/// each scenario window.
pub fn error_line() -> String {
    " (ERROR|CRIT|ALERT): ".to_string()
}
