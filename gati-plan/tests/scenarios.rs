//! End-to-end planner scenarios on a small costmap.

use gati_plan::costmap::costs;
use gati_plan::trajectory::sentinel;
use gati_plan::{CostmapModel, GridCostmap, PlannerConfig, Pose, TrajectoryPlanner, Velocity};

/// 10x10 map at 1 m resolution with no obstacles.
fn open_map() -> GridCostmap {
    GridCostmap::new(10, 10, 1.0, 0.0, 0.0)
}

/// Straight eastbound plan along y = 0.5.
fn east_plan() -> Vec<Pose> {
    (0..9).map(|i| Pose::new(0.5 + i as f64, 0.5, 0.0)).collect()
}

/// Straight northbound plan along x = 0.5.
fn north_plan() -> Vec<Pose> {
    (0..9)
        .map(|i| Pose::new(0.5, 0.5 + i as f64, std::f64::consts::FRAC_PI_2))
        .collect()
}

fn base_config() -> PlannerConfig {
    PlannerConfig {
        dwa: false,
        max_vel_x: 2.0,
        min_vel_x: 0.1,
        sim_time: 1.0,
        ..Default::default()
    }
}

#[test]
fn drives_straight_toward_the_goal() {
    let map = open_map();
    let model = CostmapModel::new(&map);
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), base_config());
    planner.update_plan(&east_plan(), false);

    let (best, command) = planner.find_best_path(Pose::new(0.5, 0.5, 0.0), Velocity::ZERO);

    assert!(best.is_legal());
    assert!(best.vx > 0.0);
    assert_eq!(best.vy, 0.0);
    assert_eq!(best.vtheta, 0.0);
    assert_eq!(command, Velocity::new(best.vx, best.vy, best.vtheta));
    assert!(best.num_points() > 1);
}

#[test]
fn rotates_in_place_to_align_with_the_plan() {
    let map = open_map();
    let model = CostmapModel::new(&map);
    let config = PlannerConfig {
        heading_scoring: true,
        max_vel_x: 0.3,
        holonomic_robot: false,
        ..base_config()
    };
    let min_in_place = config.min_in_place_vel_theta;
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), config);
    planner.update_plan(&east_plan(), false);

    // Facing north over an eastbound plan: no translating sample makes
    // progress, so the planner turns clockwise toward the plan heading.
    let (best, command) =
        planner.find_best_path(Pose::new(0.5, 0.5, std::f64::consts::FRAC_PI_2), Velocity::ZERO);

    assert!(best.is_legal());
    assert_eq!(best.vx, 0.0);
    assert!(best.vtheta.abs() >= min_in_place);
    assert!(best.vtheta < 0.0);
    assert_eq!(command.vtheta, best.vtheta);
}

#[test]
fn blocked_forward_path_falls_back_to_rotation_or_escape() {
    let mut map = open_map();
    map.set_cost(2, 0, costs::LETHAL);
    let model = CostmapModel::new(&map);
    let config = PlannerConfig {
        min_vel_x: 2.0,
        sim_time: 2.0,
        max_vel_theta: 0.3,
        min_vel_theta: -0.3,
        ..base_config()
    };
    let min_in_place = config.min_in_place_vel_theta;
    let backup_vel = config.backup_vel;
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), config);
    planner.update_plan(&east_plan(), true);

    let pose = Pose::new(0.5, 0.5, 0.0);

    // The straight-ahead sample runs into the lethal cell
    let straight = planner.score_trajectory(pose, Velocity::ZERO, Velocity::new(2.0, 0.0, 0.0));
    assert_eq!(straight, sentinel::FOOTPRINT_HIT);
    assert!(!planner.check_trajectory(pose, Velocity::ZERO, Velocity::new(2.0, 0.0, 0.0)));

    let (best, _command) = planner.find_best_path(pose, Velocity::ZERO);
    let rotated_in_place = best.vx == 0.0 && best.vtheta.abs() >= min_in_place;
    let escaped_backward = best.vx == backup_vel;
    assert!(rotated_in_place || escaped_backward);
}

#[test]
fn holonomic_robot_strafes_toward_a_lateral_plan() {
    let map = open_map();
    let model = CostmapModel::new(&map);
    let config = PlannerConfig {
        holonomic_robot: true,
        max_vel_y: 2.0,
        min_vel_y: -2.0,
        vy_samples: 5,
        ..base_config()
    };
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), config);
    planner.update_plan(&north_plan(), false);

    // Plan runs north, robot faces east: lateral motion tracks the plan
    // without turning.
    let (best, _command) = planner.find_best_path(Pose::new(0.5, 0.5, 0.0), Velocity::ZERO);

    assert!(best.is_legal());
    assert!(best.vy != 0.0);
    assert!(best.vx.abs() <= 0.1);
}

#[test]
fn dynamic_window_keeps_commands_reachable() {
    let map = open_map();
    let model = CostmapModel::new(&map);
    let config = PlannerConfig {
        dwa: true,
        sim_period: 0.1,
        acc_lim_x: 2.5,
        max_vel_x: 2.0,
        min_vel_x: 0.1,
        sim_time: 1.0,
        ..Default::default()
    };
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), config);
    planner.update_plan(&east_plan(), false);

    let current = Velocity::new(0.5, 0.0, 0.0);
    let (best, _command) = planner.find_best_path(Pose::new(0.5, 0.5, 0.0), current);

    assert!(best.is_legal());
    // One control period of acceleration bounds the commanded change
    assert!((best.vx - current.vx).abs() <= 2.5 * 0.1 + 1e-9);
}

#[test]
fn repeated_rotation_without_progress_sets_stuck_flag() {
    let map = open_map();
    let model = CostmapModel::new(&map);
    let config = PlannerConfig {
        heading_scoring: true,
        max_vel_x: 0.3,
        // Positive-only rotation range forces counter-clockwise choices
        min_vel_theta: 0.2,
        max_vel_theta: 1.0,
        ..base_config()
    };
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), config);
    planner.update_plan(&east_plan(), false);

    let pose = Pose::new(0.5, 0.5, std::f64::consts::FRAC_PI_2);

    let (first, _) = planner.find_best_path(pose, Velocity::ZERO);
    assert!(first.vtheta > 0.0);
    assert!(planner.oscillation().rotating_left);
    assert!(!planner.oscillation().stuck_left);

    // Same pose on the next tick: the robot has not translated, so
    // choosing the same rotation direction again means it is stuck.
    let (second, _) = planner.find_best_path(pose, Velocity::ZERO);
    assert!(second.vtheta > 0.0);
    assert!(planner.oscillation().stuck_left);
}

#[test]
fn escape_engages_and_releases_after_backing_up() {
    let mut map = open_map();
    // Wall across x = 2 blocks every eastbound sample; the gap at the top
    // keeps the goal field reachable on the robot's side
    for cy in 0..9 {
        map.set_cost(2, cy, costs::LETHAL);
    }
    let model = CostmapModel::new(&map);
    let config = PlannerConfig {
        min_vel_x: 2.0,
        sim_time: 2.0,
        // Two symmetric angular samples are both rejected by the
        // minimum-step guard, so no in-place rotation competes
        vtheta_samples: 2,
        backup_vel: -0.3,
        ..base_config()
    };
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), config);
    planner.update_plan(&east_plan(), true);

    let (best, command) = planner.find_best_path(Pose::new(1.5, 1.5, 0.0), Velocity::ZERO);
    assert!(planner.is_escaping());
    assert_eq!(best.vx, -0.3);
    assert!(command.vx < 0.0);

    // After backing up past the reset distance the escape ends
    let (_, _) = planner.find_best_path(Pose::new(0.9, 1.5, 0.0), Velocity::ZERO);
    assert!(!planner.is_escaping());
}

#[test]
fn cell_cost_queries_respect_the_failure_conditions() {
    let mut map = open_map();
    map.set_cost(5, 5, costs::LETHAL);
    let model = CostmapModel::new(&map);
    // A real footprint so the cells under the robot get masked
    let footprint = vec![
        gati_plan::Point::new(-0.4, -0.4),
        gati_plan::Point::new(0.4, -0.4),
        gati_plan::Point::new(0.4, 0.4),
        gati_plan::Point::new(-0.4, 0.4),
    ];
    let mut planner = TrajectoryPlanner::new(&map, &model, footprint, base_config());
    planner.update_plan(&east_plan(), false);

    let pose = Pose::new(0.5, 0.5, 0.0);
    let (_, _) = planner.find_best_path(pose, Velocity::ZERO);

    // The cell under the robot is masked
    assert!(planner.get_cell_costs(0, 0).is_none());
    // Lethal occupancy fails the query
    assert!(planner.get_cell_costs(5, 5).is_none());

    // A free cell reports the weighted breakdown
    let cell = planner.get_cell_costs(4, 1).expect("free cell");
    assert_eq!(cell.path_cost, 1.0);
    assert!(cell.goal_cost > 0.0);
    assert_eq!(cell.occ_cost, 0.0);
    let expected = 0.6 * cell.path_cost + 0.8 * cell.goal_cost + 0.01 * cell.occ_cost;
    assert!((cell.total_cost - expected).abs() < 1e-9);
}

#[test]
fn local_goal_tracks_the_plan_end() {
    let map = open_map();
    let model = CostmapModel::new(&map);
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), base_config());
    planner.update_plan(&east_plan(), true);

    assert_eq!(planner.get_local_goal(), (8.5, 0.5));
}

#[test]
fn empty_plan_yields_no_legal_command() {
    let map = open_map();
    let model = CostmapModel::new(&map);
    let mut planner = TrajectoryPlanner::new(&map, &model, Vec::new(), base_config());
    planner.update_plan(&[], true);

    let (best, command) = planner.find_best_path(Pose::new(5.5, 5.5, 0.0), Velocity::ZERO);
    assert!(!best.is_legal());
    assert_eq!(command, Velocity::ZERO);
}
