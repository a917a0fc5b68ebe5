use super::*;

impl<'a> Emitter<'a, '_> {
    /// Emit the animations that drive a translation or scale which was written as a field of a
    /// DEF'ed `Transform`, as a `TimeSensor` and a `PositionInterpolator` routed to it. Other
    /// animations are skipped.
    pub(super) fn animations(&mut self) -> Result<()> {
        let mut channels = vec![];
        for a in self.doc.iter::<Animation>() {
            a.for_each(&mut |a| channels.extend(&a.channel));
        }
        for channel in channels {
            self.animate(channel)?;
        }
        Ok(())
    }

    fn animate(&mut self, channel: &'a Channel) -> Result<()> {
        let (path, member) = channel.target_parts();
        let target = match (self.targets.get(path), member) {
            (Some(t), None) => t.clone(),
            _ => {
                log::debug!("skipping animation of {}", channel.target);
                return Ok(());
            }
        };
        let sampler = self.maps.resolve(&channel.source)?;
        let input = sampler.input(&Semantic::Input).ok_or("sampler without INPUT")?;
        let output = sampler.input(&Semantic::Output).ok_or("sampler without OUTPUT")?;
        let keys = self.maps.resolve(input)?.float_data()?;
        let output = self.maps.resolve(output)?;
        let values = output.float_data()?;
        let last = keys.last().copied().unwrap_or_default();
        if output.width() != 3 || values.len() != 3 * keys.len() || last <= 0. {
            log::warn!("skipping animation of {}: unusable keys", channel.target);
            return Ok(());
        }

        let ts = self.def_name(&format!("TS_{}", self.anim_count));
        let pi = self.def_name(&format!("PI_{}", self.anim_count));
        self.anim_count += 1;
        self.out.start_node("TimeSensor", Some(&ts))?;
        self.out
            .value_field("cycleInterval", FieldValue::Double(last.into()))?;
        self.out.value_field("loop", FieldValue::Bool(true))?;
        self.out.end_node()?;
        self.out.start_node("PositionInterpolator", Some(&pi))?;
        let key = keys.iter().map(|k| k / last).collect();
        self.out.value_field("key", FieldValue::FloatArray(key))?;
        self.out
            .value_field("keyValue", FieldValue::FloatArray(values.into_vec()))?;
        self.out.end_node()?;

        let (def, field) = target;
        self.out
            .route_decl(&Route::new(&ts, "fraction_changed", &pi, "set_fraction"))?;
        self.out.route_decl(&Route::new(
            &pi,
            "value_changed",
            def,
            format!("set_{}", field),
        ))
    }
}
