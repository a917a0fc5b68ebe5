use super::*;

/// Keyframe animation: the data sources, how to interpolate them, and what they drive.
/// Animations may be nested to group related channels.
#[derive(Clone, Debug)]
pub struct Animation {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The text string name of this element.
    pub name: Option<String>,
    /// The key times, values and interpolation types.
    pub source: Vec<Source>,
    /// How the sources are combined into curves.
    pub sampler: Vec<Sampler>,
    /// What each sampler drives.
    pub channel: Vec<Channel>,
    /// Nested animations.
    pub children: Vec<Animation>,
}

impl XNode for Animation {
    const NAME: &'static str = "animation";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut res = Animation {
            id: element.attr("id").map(Into::into),
            name: element.attr("name").map(Into::into),
            source: vec![],
            sampler: vec![],
            channel: vec![],
            children: vec![],
        };
        for e in element.children() {
            match e.name() {
                Source::NAME => res.source.push(Source::parse(e)?),
                Sampler::NAME => res.sampler.push(Sampler::parse(e)?),
                Channel::NAME => res.channel.push(Channel::parse(e)?),
                Animation::NAME => res.children.push(Animation::parse(e)?),
                "asset" | "extra" => {}
                name => return Err(format!("unexpected node <{}>", name).into()),
            }
        }
        Ok(res)
    }
}

impl Animation {
    /// Run `f` on this animation and every nested one, parents first.
    pub fn for_each<'a>(&'a self, f: &mut impl FnMut(&'a Animation)) {
        f(self);
        for a in &self.children {
            a.for_each(f)
        }
    }
}

/// Combines animation sources into a curve.
#[derive(Clone, Debug)]
pub struct Sampler {
    /// A text string containing the unique identifier of the element.
    pub id: Option<String>,
    /// The inputs: at least `INPUT` (key times) and `OUTPUT` (key values).
    pub inputs: Vec<Input>,
}

impl XNode for Sampler {
    const NAME: &'static str = "sampler";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        let mut it = element.children().peekable();
        let res = Sampler {
            id: element.attr("id").map(Into::into),
            inputs: Input::parse_list(&mut it)?,
        };
        if res.input(&Semantic::Input).is_none() || res.input(&Semantic::Output).is_none() {
            return Err("<sampler> needs INPUT and OUTPUT".into());
        }
        finish(res, it)
    }
}

impl Sampler {
    /// The source reference of the input with the given semantic.
    pub fn input(&self, semantic: &Semantic) -> Option<&UrlRef<Source>> {
        let input = self.inputs.iter().find(|i| i.semantic == *semantic)?;
        Some(input.source_as_source())
    }
}

/// Connects a [`Sampler`] to the value it drives.
#[derive(Clone, Debug)]
pub struct Channel {
    /// The sampler.
    pub source: UrlRef<Sampler>,
    /// The driven value, like `node_id/sid` or `node_id/sid.X`.
    pub target: String,
}

impl XNode for Channel {
    const NAME: &'static str = "channel";
    fn parse(element: &Element) -> Result<Self> {
        debug_assert_eq!(element.name(), Self::NAME);
        Ok(Channel {
            source: parse_attr(element.attr("source"))?.ok_or("missing source attr")?,
            target: element.attr("target").ok_or("missing target attr")?.into(),
        })
    }
}

impl Channel {
    /// The target address split into the element path and the member selection, if any:
    /// `node/sid.X` is `("node/sid", Some("X"))` and `node/sid(3)` is
    /// `("node/sid", Some("(3)"))`.
    pub fn target_parts(&self) -> (&str, Option<&str>) {
        let last = self.target.rfind('/').map_or(0, |i| i + 1);
        match self.target[last..].find(&['.', '('][..]) {
            Some(i) => {
                let (path, member) = self.target.split_at(last + i);
                (path, Some(member.trim_start_matches('.')))
            }
            None => (&self.target, None),
        }
    }
}
