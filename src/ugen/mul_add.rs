use crate::{rate::Rate, ugen::Sample};

/*
Mul/Add
=======

Almost every node can scale and offset its own output:

    out[i] = out[i] * mul[i] + add[i]

The scale (mul) and offset (add) are ordinary inputs, so each may be absent,
a control/constant value, or a full audio-rate signal. Branching on all of
that for every sample would put four checks inside the hottest loop in the
engine, so the combination is resolved once, when inputs are bound, into one
of these routines:

  MulAdd                 Loop body
  --------------------   ---------------------------------------
  None                   (nothing; the buffer is not touched)
  MulAudio               out[i] *= mul[i]
  MulControl             out[i] *= mul[0]
  AddAudio               out[i] += add[i]
  AddControl             out[i] += add[0]
  MulAudioAddAudio       out[i] = out[i] * mul[i] + add[i]
  MulAudioAddControl     out[i] = out[i] * mul[i] + add[0]
  MulControlAddAudio     out[i] = out[i] * mul[0] + add[i]
  MulControlAddControl   out[i] = out[i] * mul[0] + add[0]

Control and constant inputs only ever contribute index 0. Everything runs in
place over the node's own buffer, after the node has generated, so there is no
temporary buffer and nothing to allocate.
*/

/// Scale/offset routine selected for a node's current bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MulAdd {
    #[default]
    None,
    MulAudio,
    MulControl,
    AddAudio,
    AddControl,
    MulAudioAddAudio,
    MulAudioAddControl,
    MulControlAddAudio,
    MulControlAddControl,
}

impl MulAdd {
    /// Pick the routine for the rates of the bound `mul` and `add` inputs.
    pub fn select(mul: Option<Rate>, add: Option<Rate>) -> Self {
        let audio = |rate: Rate| rate == Rate::Audio;
        match (mul, add) {
            (None, None) => MulAdd::None,
            (Some(m), None) if audio(m) => MulAdd::MulAudio,
            (Some(_), None) => MulAdd::MulControl,
            (None, Some(a)) if audio(a) => MulAdd::AddAudio,
            (None, Some(_)) => MulAdd::AddControl,
            (Some(m), Some(a)) => match (audio(m), audio(a)) {
                (true, true) => MulAdd::MulAudioAddAudio,
                (true, false) => MulAdd::MulAudioAddControl,
                (false, true) => MulAdd::MulControlAddAudio,
                (false, false) => MulAdd::MulControlAddControl,
            },
        }
    }

    /// Apply in place over `out`. Missing buffers leave `out` untouched.
    pub fn apply(self, out: &mut [Sample], mul: Option<&[Sample]>, add: Option<&[Sample]>) {
        match (self, mul, add) {
            (MulAdd::None, _, _) => {}
            (MulAdd::MulAudio, Some(mul), _) => {
                for (o, m) in out.iter_mut().zip(mul) {
                    *o *= *m;
                }
            }
            (MulAdd::MulControl, Some(mul), _) => {
                let m = mul[0];
                for o in out.iter_mut() {
                    *o *= m;
                }
            }
            (MulAdd::AddAudio, _, Some(add)) => {
                for (o, a) in out.iter_mut().zip(add) {
                    *o += *a;
                }
            }
            (MulAdd::AddControl, _, Some(add)) => {
                let a = add[0];
                for o in out.iter_mut() {
                    *o += a;
                }
            }
            (MulAdd::MulAudioAddAudio, Some(mul), Some(add)) => {
                for ((o, m), a) in out.iter_mut().zip(mul).zip(add) {
                    *o = *o * *m + *a;
                }
            }
            (MulAdd::MulAudioAddControl, Some(mul), Some(add)) => {
                let a = add[0];
                for (o, m) in out.iter_mut().zip(mul) {
                    *o = *o * *m + a;
                }
            }
            (MulAdd::MulControlAddAudio, Some(mul), Some(add)) => {
                let m = mul[0];
                for (o, a) in out.iter_mut().zip(add) {
                    *o = *o * m + *a;
                }
            }
            (MulAdd::MulControlAddControl, Some(mul), Some(add)) => {
                let (m, a) = (mul[0], add[0]);
                for o in out.iter_mut() {
                    *o = *o * m + a;
                }
            }
            // Routine no longer matches the bindings; wait for the next select.
            _ => {}
        }
    }
}
