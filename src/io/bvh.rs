//! Parser for the plain-text BVH skeleton/motion format.

use std::str::FromStr;

use tracing::debug;

/// Deepest joint nesting accepted, counting the root and end sites.
pub const MAX_JOINT_DEPTH: usize = 256;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Unexpected end of file: expected {0}")]
    UnexpectedEof(&'static str),
    #[error("Unexpected token '{found}' at line {line}: expected {expected}")]
    UnexpectedToken { expected: &'static str, found: String, line: usize },
    #[error("Invalid number '{token}' at line {line}")]
    InvalidNumber { token: String, line: usize },
    #[error("Unknown channel '{token}' at line {line}")]
    UnknownChannel { token: String, line: usize },
    #[error("Declared {declared} frames but found {actual}")]
    FrameCount { declared: usize, actual: usize },
    #[error("Frame {frame} has {actual} values, expected {expected}")]
    FrameSize { frame: usize, expected: usize, actual: usize },
    #[error("Joint at line {line} is nested deeper than {limit} levels")]
    TooDeep { limit: usize, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xposition" => Ok(Channel::Xposition),
            "yposition" => Ok(Channel::Yposition),
            "zposition" => Ok(Channel::Zposition),
            "xrotation" => Ok(Channel::Xrotation),
            "yrotation" => Ok(Channel::Yrotation),
            "zrotation" => Ok(Channel::Zrotation),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Root,
    Joint,
    EndSite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BvhJoint {
    pub name: String,
    pub kind: JointKind,
    pub offset: [f64; 3],
    pub channels: Vec<Channel>,
    pub children: Vec<BvhJoint>,
}

impl BvhJoint {
    /// Number of joints in this subtree, end sites included.
    pub fn num_joints(&self) -> usize {
        1 + self.children.iter().map(BvhJoint::num_joints).sum::<usize>()
    }

    /// Number of channels in this subtree.
    pub fn num_channels(&self) -> usize {
        self.channels.len() + self.children.iter().map(BvhJoint::num_channels).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BvhMotion {
    pub frame_time: f64,
    pub frames: Vec<Vec<f64>>,
}

impl BvhMotion {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BvhDocument {
    pub root: BvhJoint,
    /// Absent for hierarchy-only files.
    pub motion: Option<BvhMotion>,
}

pub fn parse_bvh(text: &str) -> Result<BvhDocument, Err> {
    let mut tokens = Tokens::new(text);

    tokens.expect_keyword("HIERARCHY")?;
    tokens.expect_keyword("ROOT")?;
    let root = parse_joint(&mut tokens, JointKind::Root, 1)?;

    let motion = if tokens.peek().is_some() {
        Some(parse_motion(&mut tokens, root.num_channels())?)
    } else {
        None
    };

    debug!(
        joints = root.num_joints(),
        channels = root.num_channels(),
        frames = motion.as_ref().map(BvhMotion::num_frames),
        "parsed BVH document"
    );

    Ok(BvhDocument { root, motion })
}

/// Parses a joint body. The opening keyword has already been consumed.
fn parse_joint(tokens: &mut Tokens<'_>, kind: JointKind, depth: usize) -> Result<BvhJoint, Err> {
    if depth > MAX_JOINT_DEPTH {
        return Err(Err::TooDeep {
            limit: MAX_JOINT_DEPTH,
            line: tokens.peek().map_or(0, |token| token.line),
        });
    }
    let name = match kind {
        JointKind::EndSite => {
            tokens.expect_keyword("Site")?;
            String::new()
        }
        _ => tokens.next_token("joint name")?.text.to_string(),
    };
    tokens.expect_keyword("{")?;
    tokens.expect_keyword("OFFSET")?;
    let offset = [tokens.number::<f64>()?, tokens.number::<f64>()?, tokens.number::<f64>()?];

    let mut joint = BvhJoint {
        name,
        kind,
        offset,
        channels: Vec::new(),
        children: Vec::new(),
    };

    if kind != JointKind::EndSite && tokens.peek_is("CHANNELS") {
        tokens.next_token("CHANNELS")?;
        let count = tokens.number::<usize>()?;
        for _ in 0..count {
            let token = tokens.next_token("channel name")?;
            let channel = token.text.parse::<Channel>().map_err(|_| Err::UnknownChannel {
                token: token.text.to_string(),
                line: token.line,
            })?;
            joint.channels.push(channel);
        }
    }

    loop {
        let token = tokens.next_token("'}'")?;
        match token.text {
            "}" => break,
            "JOINT" if kind != JointKind::EndSite => {
                joint.children.push(parse_joint(tokens, JointKind::Joint, depth + 1)?);
            }
            "End" if kind != JointKind::EndSite => {
                let mut end = parse_joint(tokens, JointKind::EndSite, depth + 1)?;
                end.name = format!("{}_end", joint.name);
                joint.children.push(end);
            }
            found => {
                return Err(Err::UnexpectedToken {
                    expected: "JOINT, End Site or '}'",
                    found: found.to_string(),
                    line: token.line,
                })
            }
        }
    }

    Ok(joint)
}

fn parse_motion(tokens: &mut Tokens<'_>, channels_per_frame: usize) -> Result<BvhMotion, Err> {
    tokens.expect_keyword("MOTION")?;
    tokens.expect_keyword("Frames:")?;
    let declared = tokens.number::<usize>()?;
    tokens.expect_keyword("Frame")?;
    tokens.expect_keyword("Time:")?;
    let frame_time = tokens.number::<f64>()?;

    // Values are whitespace separated, so frames are delimited by line.
    // Every frame holds at least one token, which bounds the allocation.
    let mut frames: Vec<Vec<f64>> = Vec::with_capacity(declared.min(tokens.remaining()));
    let mut current_line = None;
    while let Some(token) = tokens.next() {
        let value = parse_number::<f64>(token)?;
        if current_line != Some(token.line) {
            current_line = Some(token.line);
            frames.push(Vec::with_capacity(channels_per_frame));
        }
        if let Some(frame) = frames.last_mut() {
            frame.push(value);
        }
    }

    if frames.len() != declared {
        return Err(Err::FrameCount { declared, actual: frames.len() });
    }
    if let Some((frame, values)) = frames.iter().enumerate().find(|(_, values)| values.len() != channels_per_frame) {
        return Err(Err::FrameSize {
            frame,
            expected: channels_per_frame,
            actual: values.len(),
        });
    }

    Ok(BvhMotion { frame_time, frames })
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    line: usize,
}

struct Tokens<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let mut tokens = Vec::new();
        for (index, line) in text.lines().enumerate() {
            for word in line.split_whitespace() {
                split_braces(word, index + 1, &mut tokens);
            }
        }
        Self { tokens, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_is(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|token| token.text == keyword)
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn next_token(&mut self, expected: &'static str) -> Result<Token<'a>, Err> {
        self.next().ok_or(Err::UnexpectedEof(expected))
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), Err> {
        let token = self.next_token(keyword)?;
        if token.text.eq_ignore_ascii_case(keyword) {
            Ok(())
        } else {
            Err(Err::UnexpectedToken {
                expected: keyword,
                found: token.text.to_string(),
                line: token.line,
            })
        }
    }

    fn number<T: FromStr>(&mut self) -> Result<T, Err> {
        let token = self.next_token("number")?;
        parse_number(token)
    }
}

fn parse_number<T: FromStr>(token: Token<'_>) -> Result<T, Err> {
    token.text.parse::<T>().map_err(|_| Err::InvalidNumber {
        token: token.text.to_string(),
        line: token.line,
    })
}

/// Splits braces glued to neighbouring words, e.g. `{OFFSET`.
fn split_braces<'a>(word: &'a str, line: usize, out: &mut Vec<Token<'a>>) {
    let mut start = 0;
    for (i, c) in word.char_indices() {
        if c == '{' || c == '}' {
            if start < i {
                out.push(Token { text: &word[start..i], line });
            }
            out.push(Token { text: &word[i..i + 1], line });
            start = i + 1;
        }
    }
    if start < word.len() {
        out.push(Token { text: &word[start..], line });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SIMPLE_BVH: &str = "\
HIERARCHY
ROOT Hips
{
    OFFSET 0.0 1.0 0.0
    CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
    JOINT Spine
    {
        OFFSET 0.0 0.25 0.0
        CHANNELS 3 Zrotation Xrotation Yrotation
        End Site
        {
            OFFSET 0.0 0.5 0.0
        }
    }
    JOINT LeftLeg
    {
        OFFSET 0.1 -0.1 0.0
        CHANNELS 3 Zrotation Xrotation Yrotation
        End Site
        {
            OFFSET 0.0 -0.9 0.0
        }
    }
}
MOTION
Frames: 2
Frame Time: 0.0333333
0 1 0 0 0 0 0 0 0 0 0 0
0 1 0 5 0 0 10 0 0 -5 0 0
";

    #[test]
    fn parses_hierarchy() {
        let doc = parse_bvh(SIMPLE_BVH).unwrap();
        let root = &doc.root;
        assert_eq!(root.name, "Hips");
        assert_eq!(root.kind, JointKind::Root);
        assert_eq!(root.offset, [0.0, 1.0, 0.0]);
        assert_eq!(root.channels.len(), 6);
        assert_eq!(root.num_joints(), 5);
        assert_eq!(root.num_channels(), 12);

        let spine = &root.children[0];
        assert_eq!(spine.name, "Spine");
        assert_eq!(spine.channels, [Channel::Zrotation, Channel::Xrotation, Channel::Yrotation]);
        assert_eq!(spine.children[0].kind, JointKind::EndSite);
        assert_eq!(spine.children[0].name, "Spine_end");
        assert_eq!(root.children[1].offset, [0.1, -0.1, 0.0]);
    }

    #[test]
    fn parses_motion() {
        let motion = parse_bvh(SIMPLE_BVH).unwrap().motion.unwrap();
        assert_eq!(motion.num_frames(), 2);
        assert!((motion.frame_time - 0.0333333).abs() < 1e-9);
        assert_eq!(motion.frames[1][3], 5.0);
    }

    #[test]
    fn hierarchy_only_is_accepted() {
        let text = SIMPLE_BVH.split("MOTION").next().unwrap();
        assert_eq!(parse_bvh(text).unwrap().motion, None);
    }

    #[test]
    fn glued_braces_are_split() {
        let text = "HIERARCHY ROOT A {OFFSET 0 0 0 CHANNELS 1 Xposition}\nMOTION\nFrames: 1\nFrame Time: 0.1\n2.5\n";
        let doc = parse_bvh(text).unwrap();
        assert_eq!(doc.motion.unwrap().frames, vec![vec![2.5]]);
    }

    #[test]
    fn wrong_frame_count_is_rejected() {
        let text = SIMPLE_BVH.replace("Frames: 2", "Frames: 3");
        assert!(matches!(parse_bvh(&text), Err(Err::FrameCount { declared: 3, actual: 2 })));
    }

    #[test]
    fn huge_declared_frame_count_is_rejected() {
        let text = SIMPLE_BVH.replace("Frames: 2", "Frames: 100000000000");
        assert!(matches!(
            parse_bvh(&text),
            Err(Err::FrameCount { declared: 100_000_000_000, actual: 2 })
        ));
    }

    /// A joint chain `depth` levels deep, root included, closed by an end site.
    pub(crate) fn nested_bvh(depth: usize) -> String {
        let mut text = String::from("HIERARCHY\nROOT J0\n{\nOFFSET 0 1 0\n");
        for i in 1..depth {
            text.push_str(&format!("JOINT J{}\n{{\nOFFSET 0 1 0\n", i));
        }
        text.push_str("End Site\n{\nOFFSET 0 1 0\n}\n");
        for _ in 0..depth {
            text.push_str("}\n");
        }
        text
    }

    #[test]
    fn nesting_is_bounded() {
        let doc = parse_bvh(&nested_bvh(MAX_JOINT_DEPTH - 1)).unwrap();
        assert_eq!(doc.root.num_joints(), MAX_JOINT_DEPTH);

        assert!(matches!(
            parse_bvh(&nested_bvh(MAX_JOINT_DEPTH)),
            Err(Err::TooDeep { limit: MAX_JOINT_DEPTH, .. })
        ));
        assert!(matches!(
            parse_bvh(&nested_bvh(200_000)),
            Err(Err::TooDeep { limit: MAX_JOINT_DEPTH, .. })
        ));
    }

    #[test]
    fn short_frame_is_rejected() {
        let text = SIMPLE_BVH.replace("0 1 0 5 0 0 10 0 0 -5 0 0", "0 1 0 5");
        assert!(matches!(parse_bvh(&text), Err(Err::FrameSize { frame: 1, expected: 12, actual: 4 })));
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(parse_bvh(""), Err(Err::UnexpectedEof(_))));
        assert!(matches!(parse_bvh("HIERARCHY\nJOINT A"), Err(Err::UnexpectedToken { line: 2, .. })));
        assert!(matches!(
            parse_bvh("HIERARCHY ROOT A { OFFSET 0 x 0 }"),
            Err(Err::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_bvh("HIERARCHY ROOT A { OFFSET 0 0 0 CHANNELS 1 Wrotation }"),
            Err(Err::UnknownChannel { .. })
        ));
        assert!(matches!(parse_bvh("HIERARCHY ROOT A { OFFSET 0 0 0"), Err(Err::UnexpectedEof(_))));
    }
}
