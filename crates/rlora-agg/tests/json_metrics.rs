mod common;

use assert_json_diff::assert_json_include;
use common::{approx, read_json, Campaign};
use rlora_agg::aggregate;
use rlora_agg::metrics::{PropagationTime, ReceptionSuccessRatio, Throughput, TimeOnAir};
use serde_json::{json, Value};

fn itervars(mobility: &str) -> Value {
    json!({
        "macProtocol": "\"MiRS\"",
        "maxX": "\"300m\"",
        "maxY": "\"300m\"",
        "ttnm": "\"4s\"",
        "numberNodes": "4",
        "mobility": format!("\"{mobility}\""),
    })
}

fn raw_export(mobility: &str, vectors: Value) -> Value {
    json!({
        "General-0-20240501-12:00:00-1": {
            "itervars": itervars(mobility),
            "attributes": {"configname": "General"},
            "vectors": vectors,
        }
    })
}

fn node_vector(node: usize, name: &str, times: &[f64], values: &[f64]) -> Value {
    json!({
        "module": format!("MeshNet.loRaNodes[{node}].LoRaNic.mac"),
        "name": name,
        "time": times,
        "value": values,
    })
}

#[test]
fn time_on_air_mixes_raw_and_flattened_runs() {
    let campaign = Campaign::new();
    campaign.put_json(
        "MiRS/300m/timeOnAir-run1.json",
        &raw_export(
            "Static",
            json!([
                node_vector(0, "timeOnAir:vector", &[1.0], &[10.0]),
                node_vector(1, "timeOnAir:vector", &[], &[]),
                node_vector(2, "timeOnAir:vector", &[1.0], &[0.0]),
                node_vector(3, "timeOnAir:vector", &[], &[]),
            ]),
        ),
    );
    campaign.put_json(
        "MiRS/300m/timeOnAir-run2.json",
        &json!({
            "metadata": {
                "macProtocol": "MiRS",
                "maxX": "300m",
                "ttnm": "4s",
                "numberNodes": "4",
                "mobility": "GaussMarkov"
            },
            "results": 0.75
        }),
    );
    campaign.put("MiRS/300m/timeOnAir-run3.json", "{ truncated");

    let catalog = campaign.catalog(&["MiRS"], &["300m"]);
    let outcome = aggregate(&TimeOnAir, &catalog, &campaign.writer()).expect("aggregate");
    assert_eq!(outcome.parsed, 2);
    assert_eq!(outcome.skipped, 1);

    let report = read_json(&campaign.report("time-on-air", "mirs_300m_time-on-air.json"));
    assert_json_include!(
        actual: report.clone(),
        expected: json!({
            "metadata": {"protocol": "mirs", "dimensions": "300m", "count": 1},
            "data": [{
                "metadata": {"numberNodes": 4, "timeToNextMission": 4.0},
                "data": {"count": 2, "mean": 0.5}
            }]
        })
    );
    let stats = &report["data"][0]["data"];
    let std = 0.125f64.sqrt();
    approx(&stats["std"], std);
    approx(&stats["ci95"][0], 0.5 - 1.96 * std / 2f64.sqrt());
    approx(&stats["ci95"][1], 0.5 + 1.96 * std / 2f64.sqrt());
}

#[test]
fn reception_ratio_is_received_over_possible() {
    let campaign = Campaign::new();
    campaign.put_json(
        "MiRS/300m/idReceived-run1.json",
        &raw_export(
            "Static",
            json!([
                node_vector(0, "couldHaveReceivedId:vector", &[1.0, 2.0], &[-1.0, 7.0]),
                node_vector(1, "couldHaveReceivedId:vector", &[1.0], &[7.0]),
                node_vector(2, "couldHaveReceivedId:vector", &[1.0], &[7.0]),
                node_vector(0, "receivedFragmentId:vector", &[2.0], &[7.0]),
                node_vector(1, "receivedFragmentId:vector", &[2.0], &[-7.0]),
            ]),
        ),
    );

    let catalog = campaign.catalog(&["MiRS"], &["300m"]);
    aggregate(&ReceptionSuccessRatio, &catalog, &campaign.writer()).expect("aggregate");

    let report = read_json(&campaign.report(
        "reception-success-ratio",
        "mirs_300m_reception-success-ratio.json",
    ));
    let data = &report["data"][0]["data"];
    assert_eq!(data["count"], json!(1));
    approx(&data["mean"], 2.0 / 3.0);
}

#[test]
fn propagation_report_holds_three_statistics() {
    let campaign = Campaign::new();
    campaign.put_json(
        "MiRS/300m/nested/missionId-run1.json",
        &raw_export(
            "Static",
            json!([
                node_vector(0, "missionIdRtsSent:vector", &[1.0, 20.0], &[1.0, 2.0]),
                node_vector(1, "receivedMissionId:vector", &[2.0, 21.0], &[1.0, 2.0]),
                node_vector(2, "receivedMissionId:vector", &[3.0], &[1.0]),
                node_vector(3, "receivedMissionId:vector", &[4.5], &[1.0]),
            ]),
        ),
    );

    let catalog = campaign.catalog(&["MiRS"], &["300m"]);
    aggregate(&PropagationTime, &catalog, &campaign.writer()).expect("aggregate");

    let report = read_json(&campaign.report(
        "propagation-time",
        "mirs_300m_propagation-time.json",
    ));
    let data = &report["data"][0]["data"];
    approx(&data["propagation_time"]["mean"], 3.5);
    let ratio = data["receiver_ratio"]["mean"].as_f64().expect("ratio mean");
    assert!((ratio - (1.0 + 0.333) / 2.0).abs() <= 0.001);
    approx(&data["receiver_ratio_full"]["mean"], 0.5);
    assert_eq!(data["propagation_time"]["count"], json!(1));
}

#[test]
fn throughput_sums_nodes_then_averages_runs() {
    let campaign = Campaign::new();
    campaign.put_json(
        "MiRS/300m/throughput-run1.json",
        &raw_export(
            "Static",
            json!([
                node_vector(0, "throughput:vector", &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]),
                node_vector(1, "throughput:vector", &[1.0, 2.0, 3.0, 4.0], &[4.0, 5.0, 6.0, 7.0]),
            ]),
        ),
    );
    campaign.put_json(
        "MiRS/300m/throughput-run2.json",
        &json!({
            "metadata": itervars("RandomWaypoint"),
            "results": [[1.0, 1.0], [2.0, 2.0]]
        }),
    );
    campaign.put_json(
        "MiRS/300m/effectiveThroughput-run1.json",
        &json!({"metadata": itervars("Static"), "results": [9.0]}),
    );

    let catalog = campaign.catalog(&["MiRS"], &["300m"]);
    let outcome = aggregate(&Throughput::total(), &catalog, &campaign.writer()).expect("aggregate");
    assert_eq!(outcome.parsed, 2);

    let report = read_json(&campaign.report("throughput", "mirs_300m_throughput.json"));
    let data = &report["data"][0]["data"];
    assert_eq!(data["mean_series"], json!([4.0, 5.0]));
    assert_eq!(data["total"]["count"], json!(2));
    approx(&data["total"]["mean"], (21.0 + 6.0) / 2.0);

    aggregate(&Throughput::effective(), &catalog, &campaign.writer()).expect("aggregate");
    let effective = read_json(&campaign.report(
        "effective-throughput",
        "mirs_300m_effective-throughput.json",
    ));
    assert_eq!(effective["data"][0]["data"]["mean_series"], json!([9.0]));
}
