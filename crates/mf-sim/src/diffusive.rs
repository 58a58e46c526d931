//! Diffusive-mixing topology and concentration-profile analysis for
//! junctions (spec section 4.5): apportions inflow into radially ordered
//! outflow sections and composes truncated-Fourier concentration profiles
//! damped by the local Peclet number.

use std::f64::consts::PI;

use mf_core::{ChannelId, MixtureId, NodeId, Real};
use mf_fluids::{DiffusiveMixture, FourierProfile, Mixture};
use mf_graph::Graph;

use crate::error::{DiffusiveError, DiffusiveResult};

/// One inflow channel's contribution to a single outflow: the sub-arc of
/// the *inflow's own* `[0, 1]` domain that this outflow draws from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutflowSection {
    pub outflow_channel: ChannelId,
    pub source_channel: ChannelId,
    pub section_start: Real,
    pub section_end: Real,
    pub flow_rate: Real,
}

/// The concentration source feeding a diffusive junction: either a single
/// uniform value, or a previously composed profile from an upstream
/// junction.
#[derive(Debug, Clone)]
pub enum InflowSource<'a> {
    Constant(&'a Mixture),
    Profile(&'a DiffusiveMixture),
}

/// Classify a node's incident channels (ordered by radial angle) into one
/// inflow group and one or more outflow groups. Spec 4.5: a valid
/// configuration is either a single inflow group facing a single outflow
/// group, or a 4-way saddle with inflow/outflow groups alternating.
pub fn classify_topology(graph: &Graph, node: NodeId) -> DiffusiveResult<(Vec<ChannelId>, Vec<ChannelId>)> {
    let mut inflow = Vec::new();
    let mut outflow = Vec::new();
    for (id, _angle, arriving) in classify_topology_with_angles(graph, node)? {
        if arriving {
            inflow.push(id);
        } else {
            outflow.push(id);
        }
    }
    Ok((inflow, outflow))
}

/// Same classification as [`classify_topology`], but keeping each channel's
/// radial angle and direction flag, in radial order, for the apportionment
/// algorithms below which need both.
fn classify_topology_with_angles(graph: &Graph, node: NodeId) -> DiffusiveResult<Vec<(ChannelId, Real, bool)>> {
    let ordered = graph.channels_by_radial_angle(node);
    if ordered.is_empty() {
        return Err(DiffusiveError::InvalidTopology { what: "node has no incident channels" });
    }

    let mut entries = Vec::with_capacity(ordered.len());
    let mut signs = Vec::with_capacity(ordered.len());
    let mut saw_inflow = false;
    let mut saw_outflow = false;
    for (inc, angle) in &ordered {
        let ch = graph
            .channel(inc.channel)
            .ok_or(DiffusiveError::InvalidTopology { what: "dangling channel reference" })?;
        let arriving = if inc.is_source_end { ch.flow_rate < 0.0 } else { ch.flow_rate > 0.0 };
        signs.push(arriving);
        saw_inflow |= arriving;
        saw_outflow |= !arriving;
        entries.push((inc.channel, *angle, arriving));
    }

    if !saw_inflow || !saw_outflow {
        return Err(DiffusiveError::InvalidTopology { what: "junction needs both inflow and outflow" });
    }

    let runs = count_runs(&signs);
    if runs != 2 && runs != 4 {
        return Err(DiffusiveError::InvalidTopology {
            what: "diffusive junction must be a single fan or a 4-way saddle",
        });
    }

    // Rotate so index 0 starts an inflow run: `channels_by_radial_angle`'s
    // ascending order can otherwise split one circular group across the
    // wrap-around point (e.g. the first and last entries both outflow).
    let n = entries.len();
    let start = (0..n)
        .find(|&i| signs[i] && !signs[(i + n - 1) % n])
        .unwrap_or(0);
    entries.rotate_left(start);

    Ok(entries)
}

/// Number of contiguous same-sign runs in a circular sequence: the count
/// of adjacent (wrapping) pairs that differ, or 1 if every element agrees.
fn count_runs(signs: &[bool]) -> usize {
    let n = signs.len();
    if n == 0 {
        return 0;
    }
    let transitions = (0..n).filter(|&i| signs[i] != signs[(i + 1) % n]).count();
    transitions.max(1)
}

/// Apportion the inflow cross-section among outflow channels, per spec 4.5:
/// each `OutflowSection` names the *inflow* channel it draws from and the
/// sub-arc of that inflow's own `[0, 1]` domain it consumes. A single
/// outflow can draw from several inflows, and a single inflow can feed
/// several outflows, whenever a bite crosses an inflow boundary.
///
/// A pure fan (one inflow block facing one outflow block) concatenates the
/// inflows along the shared arc and has the outflows, taken in radial
/// order, eat contiguous bites starting from the inflow nearest the
/// fan boundary. A 4-way saddle (two inflows and two outflows alternating)
/// instead has every outflow draw the same fraction of *every* inflow,
/// because each outflow is radially adjacent to both.
pub fn apportion_sections(graph: &Graph, node: NodeId) -> DiffusiveResult<Vec<OutflowSection>> {
    let entries = classify_topology_with_angles(graph, node)?;
    let signs: Vec<bool> = entries.iter().map(|(_, _, arriving)| *arriving).collect();
    let runs = count_runs(&signs);

    let inflow: Vec<ChannelId> = entries.iter().filter(|(_, _, a)| *a).map(|(id, _, _)| *id).collect();
    let outflow: Vec<ChannelId> = entries.iter().filter(|(_, _, a)| !*a).map(|(id, _, _)| *id).collect();

    if runs == 4 {
        apportion_saddle(graph, &entries, &inflow, &outflow)
    } else {
        apportion_fan(graph, &inflow, &outflow)
    }
}

/// Pure-fan apportionment: concatenate the inflow block (in radial order)
/// into a stack, then have the outflow block (in radial order) drain it
/// from the nearest inflow outward, splitting an outflow's bite across
/// inflow boundaries as needed.
fn apportion_fan(graph: &Graph, inflow: &[ChannelId], outflow: &[ChannelId]) -> DiffusiveResult<Vec<OutflowSection>> {
    let total_out: Real = outflow.iter().filter_map(|id| graph.channel(*id)).map(|c| c.flow_rate.abs()).sum();
    if total_out <= 0.0 {
        return Err(DiffusiveError::InvalidArg { what: "zero total outflow" });
    }

    // (channel, full width of this channel, remaining amount, remaining local range)
    let mut stack: Vec<(ChannelId, Real, Real, Real, Real)> = Vec::with_capacity(inflow.len());
    for id in inflow {
        let ch = graph.channel(*id).ok_or(DiffusiveError::InvalidTopology { what: "dangling channel reference" })?;
        let full = ch.flow_rate.abs();
        if full > 0.0 {
            stack.push((*id, full, full, 0.0, 1.0));
        }
    }

    let mut sections = Vec::new();
    for id in outflow {
        let ch = graph.channel(*id).ok_or(DiffusiveError::InvalidTopology { what: "dangling channel reference" })?;
        let mut need = ch.flow_rate.abs();
        while need > 1e-15 {
            let Some((source, full, remaining, lo, hi)) = stack.pop() else {
                return Err(DiffusiveError::InvalidArg { what: "inflow exhausted before outflow satisfied" });
            };
            let take = need.min(remaining);
            let local_end = lo + take / full;
            sections.push(OutflowSection {
                outflow_channel: *id,
                source_channel: source,
                section_start: lo,
                section_end: local_end,
                flow_rate: take,
            });
            let left = remaining - take;
            if left > 1e-15 {
                stack.push((source, full, left, local_end, hi));
            }
            need -= take;
        }
    }
    Ok(sections)
}

/// Saddle apportionment (two inflows, two outflows, alternating radially):
/// every outflow is radially adjacent to both inflows, so each draws the
/// same fraction of *every* inflow's width. Within one inflow's own local
/// range, whichever outflow is reached first walking forward (radially)
/// from that inflow gets the near slice; the other gets the remainder.
fn apportion_saddle(
    graph: &Graph,
    entries: &[(ChannelId, Real, bool)],
    inflow: &[ChannelId],
    outflow: &[ChannelId],
) -> DiffusiveResult<Vec<OutflowSection>> {
    if inflow.len() != 2 || outflow.len() != 2 {
        return Err(DiffusiveError::InvalidTopology { what: "4-way saddle needs exactly two inflows and two outflows" });
    }
    let total_out: Real = outflow.iter().filter_map(|id| graph.channel(*id)).map(|c| c.flow_rate.abs()).sum();
    if total_out <= 0.0 {
        return Err(DiffusiveError::InvalidArg { what: "zero total outflow" });
    }

    let angle_of = |id: ChannelId| entries.iter().find(|(c, _, _)| *c == id).map(|(_, a, _)| *a).unwrap_or(0.0);

    let mut sections = Vec::with_capacity(4);
    for &in_id in inflow {
        let in_ch = graph.channel(in_id).ok_or(DiffusiveError::InvalidTopology { what: "dangling channel reference" })?;
        let in_flow = in_ch.flow_rate.abs();
        let in_angle = angle_of(in_id);

        // The outflow reached first walking forward (increasing angle,
        // wrapping past 2*pi) from this inflow gets the near (low) slice.
        let near = outflow
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = forward_angular_gap(in_angle, angle_of(*a));
                let db = forward_angular_gap(in_angle, angle_of(*b));
                da.partial_cmp(&db).expect("angles are finite")
            })
            .expect("saddle has exactly two outflows");
        let far = outflow.iter().copied().find(|id| *id != near).expect("saddle has exactly two outflows");

        let near_ch = graph.channel(near).expect("validated above");
        let far_ch = graph.channel(far).expect("validated above");
        let near_fraction = near_ch.flow_rate.abs() / total_out;
        let far_fraction = far_ch.flow_rate.abs() / total_out;

        sections.push(OutflowSection {
            outflow_channel: near,
            source_channel: in_id,
            section_start: 0.0,
            section_end: near_fraction,
            flow_rate: near_fraction * in_flow,
        });
        sections.push(OutflowSection {
            outflow_channel: far,
            source_channel: in_id,
            section_start: near_fraction,
            section_end: near_fraction + far_fraction,
            flow_rate: far_fraction * in_flow,
        });
    }
    Ok(sections)
}

/// Angular distance walking forward (increasing angle) from `from` to `to`,
/// wrapping past `2*pi`.
fn forward_angular_gap(from: Real, to: Real) -> Real {
    let two_pi = std::f64::consts::TAU;
    let gap = to - from;
    if gap < 0.0 { gap + two_pi } else { gap }
}

/// Peclet number for a channel of the given geometry and bulk flow speed,
/// per spec 4.5: `Pe = velocity * width / diffusivity`.
pub fn peclet_number(width: Real, flow_rate: Real, height: Real, diffusivity: Real) -> Real {
    let velocity = flow_rate.abs() / (width * height).max(Real::MIN_POSITIVE);
    velocity * width / diffusivity.max(Real::MIN_POSITIVE)
}

const MODES: usize = 8;

/// Compose the truncated-Fourier concentration profile seen by one outflow
/// section, given its apportioned inflow and the junction's Peclet number.
/// A constant inflow source produces the analytical constant-source
/// solution; a profile source is re-projected onto the section's local
/// coordinate and damped mode-by-mode.
pub fn compose_profile(
    section: &OutflowSection,
    source: &InflowSource,
    peclet: Real,
    result_id: MixtureId,
) -> DiffusiveResult<FourierProfile> {
    if peclet <= 0.0 || !peclet.is_finite() {
        return Err(DiffusiveError::InvalidArg { what: "peclet number" });
    }
    let _ = result_id;
    let width = section.section_end - section.section_start;
    if !(width > 0.0) {
        return Err(DiffusiveError::InvalidArg { what: "degenerate outflow section" });
    }

    match source {
        InflowSource::Constant(mixture) => Ok(constant_source_profile(*mixture, section, peclet)),
        InflowSource::Profile(diffusive) => Ok(reprojected_profile(diffusive, section, peclet)),
    }
}

/// Analytical solution for a constant concentration `c` occupying only
/// `[section_start, section_end]` of the junction's `[0, 1]` cross-section
/// (the rest held by other inflows): this is a step function, whose
/// Fourier coefficients are `a0 = (end - start) * c` and
/// `a_n = (2 / (n*pi)) * c * [sin(n*pi*end) - sin(n*pi*start)]`, damped the
/// same way `reprojected_profile` damps a re-projected harmonic. A section
/// spanning the whole arc (`[0, 1]`) degenerates to the undamped constant
/// `a0 = c` with no harmonics, since a full-width step has none.
fn constant_source_profile(mixture: &Mixture, section: &OutflowSection, peclet: Real) -> FourierProfile {
    let c: Real = mixture.species().map(|s| mixture.concentration(s)).sum();
    let start = section.section_start;
    let end = section.section_end;

    let a0 = (end - start) * c;
    let mut coeffs = Vec::with_capacity(MODES);
    for n in 1..=MODES {
        let n_f = n as Real;
        let a_n = (2.0 / (n_f * PI)) * c * ((n_f * PI * end).sin() - (n_f * PI * start).sin());
        let damping = (-n_f * n_f * PI * PI / peclet).exp();
        coeffs.push(a_n * damping);
    }
    FourierProfile { a0, coeffs }
}

/// Re-project an upstream profile onto a narrower outflow section and
/// apply the Peclet damping `exp(-n^2 * pi^2 * x / Pe)` to each harmonic,
/// per spec 4.5's diffusive length-scale argument.
fn reprojected_profile(upstream: &DiffusiveMixture, section: &OutflowSection, peclet: Real) -> FourierProfile {
    let mut a0 = 0.0;
    let mut count = 0usize;
    let samples = 33;
    for i in 0..=samples {
        let xi = section.section_start
            + (section.section_end - section.section_start) * (i as Real / samples as Real);
        for specie in upstream.species() {
            if let Some(profile) = upstream.profile(specie) {
                a0 += profile.evaluate(xi);
                count += 1;
            }
        }
    }
    if count > 0 {
        a0 /= count as Real;
    }

    let mut coeffs = Vec::with_capacity(MODES);
    for n in 1..=MODES {
        let n_f = n as Real;
        let mut a_n = 0.0;
        let mut contributions = 0usize;
        for i in 0..samples {
            let xi = section.section_start
                + (section.section_end - section.section_start) * (i as Real / samples as Real);
            for specie in upstream.species() {
                if let Some(profile) = upstream.profile(specie) {
                    a_n += (profile.evaluate(xi) - a0) * (n_f * PI * xi).cos();
                    contributions += 1;
                }
            }
        }
        if contributions > 0 {
            a_n = 2.0 * a_n / contributions as Real;
        }
        let damping = (-n_f * n_f * PI * PI / peclet).exp();
        coeffs.push(a_n * damping);
    }

    FourierProfile { a0, coeffs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_core::SpecieId;
    use mf_graph::{ChannelKind, GraphBuilder};
    use std::collections::HashMap;

    fn three_way_junction() -> (Graph, NodeId, ChannelId, ChannelId, ChannelId) {
        let mut b = GraphBuilder::new();
        let inlet = b.add_node((-1.0, 0.0), false, false);
        let center = b.add_node((0.0, 0.0), false, false);
        let out_a = b.add_node((1.0, 0.5), true, false);
        let out_b = b.add_node((1.0, -0.5), true, false);
        let c_in = b.add_channel(inlet, center, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        let c_a = b.add_channel(center, out_a, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        let c_b = b.add_channel(center, out_b, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        let mut graph = b.build().unwrap();
        graph.channel_mut(c_in).unwrap().flow_rate = 2e-9;
        graph.channel_mut(c_a).unwrap().flow_rate = 1.5e-9;
        graph.channel_mut(c_b).unwrap().flow_rate = 0.5e-9;
        (graph, center, c_in, c_a, c_b)
    }

    #[test]
    fn classify_splits_inflow_and_outflow() {
        let (graph, center, c_in, c_a, c_b) = three_way_junction();
        let (inflow, outflow) = classify_topology(&graph, center).unwrap();
        assert_eq!(inflow, vec![c_in]);
        assert_eq!(outflow.len(), 2);
        assert!(outflow.contains(&c_a));
        assert!(outflow.contains(&c_b));
    }

    #[test]
    fn sections_apportion_by_flow_fraction() {
        let (graph, center, c_in, c_a, c_b) = three_way_junction();
        let sections = apportion_sections(&graph, center).unwrap();
        assert_eq!(sections.len(), 2);
        assert!(sections.iter().all(|s| s.source_channel == c_in));
        let total_width: Real = sections.iter().map(|s| s.section_end - s.section_start).sum();
        assert!((total_width - 1.0).abs() < 1e-12);
        let wide = sections.iter().find(|s| s.outflow_channel == c_a).unwrap();
        let narrow = sections.iter().find(|s| s.outflow_channel == c_b).unwrap();
        assert!(wide.section_end - wide.section_start > narrow.section_end - narrow.section_start);
    }

    #[test]
    fn full_width_constant_source_has_zero_harmonics() {
        let specie = SpecieId::from_index(0);
        let mut conc = HashMap::new();
        conc.insert(specie, 3.0);
        let mixture = Mixture::new(MixtureId::from_index(0), conc);
        let section = OutflowSection {
            outflow_channel: ChannelId::from_index(1),
            source_channel: ChannelId::from_index(0),
            section_start: 0.0,
            section_end: 1.0,
            flow_rate: 1.0,
        };
        let profile = compose_profile(
            &section,
            &InflowSource::Constant(&mixture),
            100.0,
            MixtureId::from_index(1),
        )
        .unwrap();
        assert_eq!(profile.a0, 3.0);
        assert!(profile.coeffs.iter().all(|c| c.abs() < 1e-12));
    }

    #[test]
    fn partial_width_constant_source_has_step_harmonics() {
        let specie = SpecieId::from_index(0);
        let mut conc = HashMap::new();
        conc.insert(specie, 3.0);
        let mixture = Mixture::new(MixtureId::from_index(0), conc);
        let section = OutflowSection {
            outflow_channel: ChannelId::from_index(1),
            source_channel: ChannelId::from_index(0),
            section_start: 0.0,
            section_end: 0.5,
            flow_rate: 1.0,
        };
        let profile = compose_profile(
            &section,
            &InflowSource::Constant(&mixture),
            100.0,
            MixtureId::from_index(1),
        )
        .unwrap();
        assert!((profile.a0 - 1.5).abs() < 1e-12);
        let expected_a1 =
            (2.0 / PI) * 3.0 * (PI * 0.5).sin() * (-PI * PI / 100.0).exp();
        assert!((profile.coeffs[0] - expected_a1).abs() < 1e-9);
    }

    #[test]
    fn high_peclet_preserves_more_structure_than_low_peclet() {
        let profile_hi = FourierProfile { a0: 0.5, coeffs: vec![1.0, 1.0] };
        let mut profiles = HashMap::new();
        profiles.insert(SpecieId::from_index(0), profile_hi);
        let upstream = DiffusiveMixture::new(MixtureId::from_index(0), profiles);
        let section = OutflowSection {
            outflow_channel: ChannelId::from_index(1),
            source_channel: ChannelId::from_index(0),
            section_start: 0.0,
            section_end: 1.0,
            flow_rate: 1.0,
        };
        let low_pe = compose_profile(&section, &InflowSource::Profile(&upstream), 1.0, MixtureId::from_index(1)).unwrap();
        let high_pe = compose_profile(&section, &InflowSource::Profile(&upstream), 1000.0, MixtureId::from_index(1)).unwrap();
        let mag_low: Real = low_pe.coeffs.iter().map(|c| c.abs()).sum();
        let mag_high: Real = high_pe.coeffs.iter().map(|c| c.abs()).sum();
        assert!(mag_high >= mag_low);
    }

    /// Ported from the four-way-saddle fixture: two opposed inflow/outflow
    /// pairs at unequal flow rates, each outflow drawing a uniform fraction
    /// of every inflow's width.
    fn saddle_junction() -> (Graph, NodeId, ChannelId, ChannelId, ChannelId, ChannelId) {
        let mut b = GraphBuilder::new();
        let east = b.add_node((1.0, 0.0), false, false);
        let north = b.add_node((0.0, 1.0), true, false);
        let west = b.add_node((-1.0, 0.0), false, false);
        let south = b.add_node((0.0, -1.0), true, false);
        let center = b.add_node((0.0, 0.0), false, false);
        let c_east = b.add_channel(east, center, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        let c_north = b.add_channel(center, north, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        let c_west = b.add_channel(west, center, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        let c_south = b.add_channel(center, south, 1e-4, 1e-4, Some(1e-3), ChannelKind::Normal);
        let mut graph = b.build().unwrap();
        graph.channel_mut(c_east).unwrap().flow_rate = 3e-9;
        graph.channel_mut(c_north).unwrap().flow_rate = 2.4e-9;
        graph.channel_mut(c_west).unwrap().flow_rate = 1e-9;
        graph.channel_mut(c_south).unwrap().flow_rate = 1.6e-9;
        (graph, center, c_east, c_north, c_west, c_south)
    }

    #[test]
    fn saddle_apportions_uniform_fraction_of_each_inflow() {
        let (graph, center, c_east, c_north, c_west, c_south) = saddle_junction();
        let sections = apportion_sections(&graph, center).unwrap();
        assert_eq!(sections.len(), 4);

        let find = |outflow: ChannelId, source: ChannelId| {
            sections
                .iter()
                .find(|s| s.outflow_channel == outflow && s.source_channel == source)
                .unwrap()
        };

        let east_to_north = find(c_north, c_east);
        let east_to_south = find(c_south, c_east);
        let west_to_south = find(c_south, c_west);
        let west_to_north = find(c_north, c_west);

        assert!((east_to_north.flow_rate - 1.8e-9).abs() < 1e-15);
        assert!((east_to_south.flow_rate - 1.2e-9).abs() < 1e-15);
        assert!((west_to_south.flow_rate - 0.4e-9).abs() < 1e-15);
        assert!((west_to_north.flow_rate - 0.6e-9).abs() < 1e-15);

        let north_total = east_to_north.flow_rate + west_to_north.flow_rate;
        let south_total = east_to_south.flow_rate + west_to_south.flow_rate;
        assert!((north_total - 2.4e-9).abs() < 1e-15);
        assert!((south_total - 1.6e-9).abs() < 1e-15);
    }
}
