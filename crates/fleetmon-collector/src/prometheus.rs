//! Prometheus text exposition format.
//!
//! Renders the live fleet into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use fleetmon_state::StoredMetric;

/// Render the live per-node metrics into Prometheus text format.
///
/// Produces GAUGE metrics with `tenant` labels plus a fleet-size gauge.
pub fn render_prometheus(metrics: &[StoredMetric]) -> String {
    let mut out = String::new();

    out.push_str("# HELP fleetmon_nodes_total Nodes with a live metric record.\n");
    out.push_str("# TYPE fleetmon_nodes_total gauge\n");
    out.push_str(&format!("fleetmon_nodes_total {}\n", metrics.len()));

    out.push_str("# HELP fleetmon_node_up Whether the node reports status running.\n");
    out.push_str("# TYPE fleetmon_node_up gauge\n");
    for m in metrics {
        out.push_str(&format!(
            "fleetmon_node_up{{tenant=\"{}\",status=\"{}\"}} {}\n",
            escape_label(&m.tenant_id),
            escape_label(m.status.as_str()),
            u8::from(m.status.is_running())
        ));
    }

    out.push_str("# HELP fleetmon_node_memory_bytes Memory in use in bytes.\n");
    out.push_str("# TYPE fleetmon_node_memory_bytes gauge\n");
    for m in metrics {
        out.push_str(&format!(
            "fleetmon_node_memory_bytes{{tenant=\"{}\"}} {}\n",
            escape_label(&m.tenant_id),
            m.memory_bytes
        ));
    }

    out.push_str(
        "# HELP fleetmon_node_memory_usage_percent Memory in use as a percentage of the node limit.\n",
    );
    out.push_str("# TYPE fleetmon_node_memory_usage_percent gauge\n");
    for m in metrics {
        out.push_str(&format!(
            "fleetmon_node_memory_usage_percent{{tenant=\"{}\"}} {:.2}\n",
            escape_label(&m.tenant_id),
            m.memory_usage_percent
        ));
    }

    out.push_str("# HELP fleetmon_node_key_count Keys held by the node.\n");
    out.push_str("# TYPE fleetmon_node_key_count gauge\n");
    for m in metrics {
        out.push_str(&format!(
            "fleetmon_node_key_count{{tenant=\"{}\"}} {}\n",
            escape_label(&m.tenant_id),
            m.key_count
        ));
    }

    out
}

/// Escape a label value per the exposition format.
fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
