use super::file_io::*;

fn label(name: &str) -> Option<String> {
    (!name.is_empty()).then(|| name.to_string())
}

#[inline(always)]
fn push<T>(table: &mut Option<Vec<T>>, make: impl FnOnce(i64) -> T) -> i64 {
    let rows = table.get_or_insert_with(Vec::new);
    let index = rows.len() as i64;
    rows.push(make(index));
    index
}

/// Creates networks element by element, assigning sequential indices per table
/// like pandapower's `create_*` functions do.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    net: Network,
}

impl NetworkBuilder {
    pub fn new(f_hz: f64, sn_mva: f64) -> Self {
        Self {
            net: Network {
                f_hz,
                sn_mva,
                ..Default::default()
            },
        }
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.net.name = label(name);
        self
    }

    pub fn bus(&mut self, name: &str, vn_kv: f64) -> i64 {
        let index = self.net.bus.len() as i64;
        self.net.bus.push(Bus {
            index,
            name: label(name),
            vn_kv,
            type_: Some("b".into()),
            zone: None,
            in_service: true,
            max_vm_pu: None,
            min_vm_pu: None,
        });
        index
    }

    pub fn ext_grid(&mut self, bus: i64, vm_pu: f64, va_degree: f64) -> i64 {
        push(&mut self.net.ext_grid, |index| ExtGrid {
            index,
            name: None,
            bus,
            vm_pu,
            va_degree,
            slack_weight: 1.0,
            max_p_mw: None,
            min_p_mw: None,
            max_q_mvar: None,
            min_q_mvar: None,
            in_service: true,
        })
    }

    pub fn generator(&mut self, bus: i64, name: &str, p_mw: f64, vm_pu: f64) -> i64 {
        push(&mut self.net.generator, |index| Gen {
            index,
            name: label(name),
            bus,
            p_mw,
            vm_pu,
            sn_mva: None,
            min_q_mvar: None,
            max_q_mvar: None,
            min_p_mw: None,
            max_p_mw: None,
            scaling: 1.0,
            slack: false,
            slack_weight: 0.0,
            controllable: true,
            in_service: true,
            type_: None,
        })
    }

    /// Sets the reactive power limits of generator `index`.
    pub fn q_limits(&mut self, index: i64, min_q_mvar: f64, max_q_mvar: f64) -> &mut Self {
        if let Some(g) = self
            .net
            .generator
            .as_mut()
            .and_then(|rows| rows.get_mut(index as usize))
        {
            g.min_q_mvar = Some(min_q_mvar);
            g.max_q_mvar = Some(max_q_mvar);
        }
        self
    }

    pub fn slack_gen(&mut self, bus: i64, name: &str, vm_pu: f64) -> i64 {
        let index = self.generator(bus, name, 0.0, vm_pu);
        if let Some(g) = self.net.generator.as_mut().and_then(|rows| rows.last_mut()) {
            g.slack = true;
            g.slack_weight = 1.0;
        }
        index
    }

    pub fn sgen(&mut self, bus: i64, name: &str, p_mw: f64, q_mvar: f64) -> i64 {
        push(&mut self.net.sgen, |index| SGen {
            index,
            name: label(name),
            bus,
            p_mw,
            q_mvar,
            sn_mva: None,
            scaling: 1.0,
            in_service: true,
            type_: None,
            current_source: false,
        })
    }

    pub fn load(&mut self, bus: i64, name: &str, p_mw: f64, q_mvar: f64) -> i64 {
        push(&mut self.net.load, |index| Load {
            index,
            name: label(name),
            bus,
            p_mw,
            q_mvar,
            const_z_percent: 0.0,
            const_i_percent: 0.0,
            sn_mva: None,
            scaling: 1.0,
            in_service: true,
            type_: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn line(
        &mut self,
        from_bus: i64,
        to_bus: i64,
        name: &str,
        length_km: f64,
        r_ohm_per_km: f64,
        x_ohm_per_km: f64,
        c_nf_per_km: f64,
        max_i_ka: f64,
    ) -> i64 {
        push(&mut self.net.line, |index| Line {
            index,
            name: label(name),
            std_type: None,
            from_bus,
            to_bus,
            length_km,
            r_ohm_per_km,
            x_ohm_per_km,
            c_nf_per_km,
            g_us_per_km: 0.0,
            max_i_ka,
            df: 1.0,
            parallel: 1,
            type_: Some("ol".into()),
            in_service: true,
            max_loading_percent: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn trafo(
        &mut self,
        hv_bus: i64,
        lv_bus: i64,
        name: &str,
        sn_mva: f64,
        vn_hv_kv: f64,
        vn_lv_kv: f64,
        vk_percent: f64,
        vkr_percent: f64,
        shift_degree: f64,
    ) -> i64 {
        push(&mut self.net.trafo, |index| Transformer {
            index,
            name: label(name),
            std_type: None,
            hv_bus,
            lv_bus,
            sn_mva,
            vn_hv_kv,
            vn_lv_kv,
            vk_percent,
            vkr_percent,
            pfe_kw: 0.0,
            i0_percent: 0.0,
            shift_degree,
            tap_side: None,
            tap_neutral: None,
            tap_min: None,
            tap_max: None,
            tap_step_percent: None,
            tap_step_degree: None,
            tap_pos: None,
            tap_phase_shifter: false,
            parallel: 1,
            df: 1.0,
            in_service: true,
            max_loading_percent: None,
        })
    }

    /// Sets the no-load losses of transformer `index`.
    pub fn trafo_losses(&mut self, index: i64, pfe_kw: f64, i0_percent: f64) -> &mut Self {
        if let Some(t) = self
            .net
            .trafo
            .as_mut()
            .and_then(|rows| rows.get_mut(index as usize))
        {
            t.pfe_kw = pfe_kw;
            t.i0_percent = i0_percent;
        }
        self
    }

    pub fn shunt(&mut self, bus: i64, name: &str, p_mw: f64, q_mvar: f64) -> i64 {
        let vn_kv = self
            .net
            .bus
            .iter()
            .find(|b| b.index == bus)
            .map_or(f64::NAN, |b| b.vn_kv);
        push(&mut self.net.shunt, |index| Shunt {
            index,
            name: label(name),
            bus,
            p_mw,
            q_mvar,
            vn_kv,
            step: 1,
            max_step: 1,
            in_service: true,
        })
    }

    pub fn switch(&mut self, bus: i64, element: i64, et: SwitchType, closed: bool) -> i64 {
        push(&mut self.net.switch, |index| Switch {
            index,
            name: None,
            bus,
            element,
            et,
            type_: None,
            closed,
            z_ohm: 0.0,
        })
    }

    pub fn build(self) -> Network {
        self.net
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_sequential_per_table() {
        let mut b = NetworkBuilder::new(50.0, 1.0);
        let b0 = b.bus("a", 20.0);
        let b1 = b.bus("", 20.0);
        assert_eq!((b0, b1), (0, 1));
        assert_eq!(b.load(b1, "l0", 1.0, 0.2), 0);
        assert_eq!(b.load(b1, "l1", 1.0, 0.2), 1);
        assert_eq!(b.line(b0, b1, "", 1.0, 0.1, 0.1, 0.0, 0.2), 0);
        let g = b.slack_gen(b0, "g", 1.0);
        b.q_limits(g, -5.0, 5.0);
        let b2 = b.bus("lv", 0.4);
        let t = b.trafo(b1, b2, "t", 0.25, 20.0, 0.4, 6.0, 1.44, 150.0);
        b.trafo_losses(t, 0.6, 0.24);
        let net = b.build();
        assert_eq!(net.bus[1].name, None);
        assert!(net.gens()[0].slack);
        assert_eq!(net.gens()[0].max_q_mvar, Some(5.0));
        assert_eq!((net.trafos()[0].pfe_kw, net.trafos()[0].i0_percent), (0.6, 0.24));
        assert_eq!(net.ext_grid, None);
    }
}
